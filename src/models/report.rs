use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ValidationRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// All steps were considered (executed or deliberately skipped after an
    /// assertion halt)
    Completed,
    /// A fatal engine error or a cancellation cut the run short
    Aborted,
}

/// Outcome of one validation rule
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationOutcome {
    pub rule: ValidationRule,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of a single step execution
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestExecutionResult {
    pub step_id: Uuid,
    pub step_name: String,
    pub status: StepStatus,
    pub success: bool,
    /// Milliseconds spent in the last attempt
    pub response_time: i64,
    pub status_code: Option<u16>,
    pub response_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    /// Transport attempts performed (0 for skipped and SQL-only steps)
    pub attempts: i32,
    pub validations: Vec<ValidationOutcome>,
    /// Values this step contributed to the run overlay
    pub extracted: HashMap<String, serde_json::Value>,
}

/// Aggregated result of one case run; returned to the caller, never persisted
/// by the engine
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestReport {
    pub test_case_id: Uuid,
    pub name: String,
    pub status: RunStatus,
    pub success: bool,
    pub total_steps: i32,
    pub success_steps: i32,
    pub fail_steps: i32,
    pub skipped_steps: i32,
    #[schema(value_type = String)]
    pub start_time: OffsetDateTime,
    #[schema(value_type = String)]
    pub end_time: OffsetDateTime,
    /// Wall-clock milliseconds from first dispatch to last completion
    pub duration: i64,
    pub details: Vec<TestExecutionResult>,
}
