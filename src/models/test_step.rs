use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    pub id: Uuid,
    pub test_case_id: Uuid,
    pub name: String,
    pub url: String, // absolute, or relative to the project base_url; empty for SQL-only steps
    pub method: String,
    pub headers: serde_json::Value,
    pub params: serde_json::Value,
    pub body: serde_json::Value,
    pub files: serde_json::Value, // form field name -> file path
    pub auth: serde_json::Value,
    pub extract: serde_json::Value,     // variable name -> response path
    pub validate: serde_json::Value,    // [ValidationRule]
    pub sql_queries: serde_json::Value, // [SqlQuery]
    pub timeout: i32,                   // seconds per attempt
    pub retry: i32,                     // extra attempts on transport failure
    pub retry_interval: i32,            // seconds between attempts
    pub order: i32,
    pub status: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateTestStep {
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers: serde_json::Value,
    pub params: serde_json::Value,
    pub body: serde_json::Value,
    pub files: serde_json::Value,
    pub auth: serde_json::Value,
    pub extract: serde_json::Value,
    pub validate: serde_json::Value,
    pub sql_queries: serde_json::Value,
    pub timeout: i32,
    pub retry: i32,
    pub retry_interval: i32,
    pub order: i32,
    pub status: i32,
}

/// A single assertion against the response document
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationRule {
    /// Path into the response document (status_code, headers.*, body.*, sql.*)
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub expected: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Contains,
    NotContains,
    Gt,
    Lt,
    Gte,
    Lte,
    Regex,
    Exists,
    NotExists,
    StartsWith,
    EndsWith,
    LengthEq,
}

/// Cross-check query against a named data source
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SqlQuery {
    pub name: String,
    pub sql: String,
    /// Configured data source name; "default" when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthSpec {
    None,
    Bearer { token: String },
    Basic { username: String, password: String },
}

/// One entry of a bulk reorder request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StepOrder {
    pub step_id: Uuid,
    pub order: i32,
}
