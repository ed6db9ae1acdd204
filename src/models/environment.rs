use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String, // e.g., "dev", "staging", "production"
    pub description: Option<String>,
    pub variables: serde_json::Value, // embedded bag of environment-scope entries
    pub is_default: bool,
    pub status: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateEnvironment {
    pub name: String,
    pub description: Option<String>,
    pub variables: Option<serde_json::Value>,
    pub status: Option<i32>,
}
