use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_url: String,             // relative step URLs are joined onto this
    pub headers: serde_json::Value,   // default request headers (object)
    pub variables: serde_json::Value, // project-scope defaults bag (object)
    pub status: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub base_url: String,
    pub headers: Option<serde_json::Value>,
    pub variables: Option<serde_json::Value>,
}
