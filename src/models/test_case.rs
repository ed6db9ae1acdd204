use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Opaque collaborator metadata, not evaluated by the engine
    pub pre_script: Option<String>,
    pub post_script: Option<String>,
    /// When false, the first assertion failure skips the remaining steps
    pub continue_on_failure: bool,
    pub status: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateTestCase {
    pub name: String,
    pub description: Option<String>,
    pub pre_script: Option<String>,
    pub post_script: Option<String>,
    pub continue_on_failure: Option<bool>,
    pub status: Option<i32>,
}
