use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Environment, TestExecutionResult, TestReport, STATUS_DISABLED};
use crate::repositories::{
    EnvironmentRepository, ProjectRepository, Repository, TestCaseRepository, TestStepRepository,
};
use crate::services::{CaseRunner, RunOptions};
use crate::state::AppState;

// ============ Request/Response DTOs ============

/// Options for an execute call. The whole body may be omitted.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ExecuteRequest {
    /// Environment to run against; the project default when absent
    pub environment_id: Option<Uuid>,
    /// Values layered on top of every stored scope for this run only
    #[serde(default)]
    pub temp_variables: HashMap<String, serde_json::Value>,
    /// Promote the values extracted by the run to case-scope variables
    #[serde(default)]
    pub persist_extracted: bool,
}

impl ExecuteRequest {
    fn into_options(self) -> RunOptions {
        RunOptions {
            temp_variables: self.temp_variables,
            persist_extracted: self.persist_extracted,
        }
    }
}

// ============ Handlers ============

/// Run every enabled step of a test case
#[utoipa::path(
    post,
    path = "/api/test_cases/{id}/execute",
    params(
        ("id" = Uuid, Path, description = "Test case ID")
    ),
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Run report; step failures are data, not errors", body = TestReport),
        (status = 404, description = "Test case or environment not found"),
        (status = 409, description = "Case disabled, or environment of another project"),
        (status = 422, description = "Unresolved variable, circular template or malformed extraction")
    ),
    tag = "Execution"
)]
pub async fn execute_test_case(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ExecuteRequest>>,
) -> AppResult<Json<TestReport>> {
    let payload = body.map(|Json(p)| p).unwrap_or_default();

    let case = TestCaseRepository::find_by_id(&state.db, id).await?;
    if case.status == STATUS_DISABLED {
        return Err(AppError::Constraint("test case is disabled".to_string()));
    }
    let project = ProjectRepository::find_by_id(&state.db, case.project_id).await?;
    let environment = select_environment(&state, case.project_id, payload.environment_id).await?;

    let steps = TestStepRepository::find_enabled_by_case(&state.db, case.id).await?;

    let report = CaseRunner::new(&state)
        .run(
            &project,
            &case,
            environment.as_ref(),
            &steps,
            payload.into_options(),
        )
        .await?;
    Ok(Json(report))
}

/// Run a single step on its own, with the scope chain of its case
#[utoipa::path(
    post,
    path = "/api/test_steps/{id}/execute",
    params(
        ("id" = Uuid, Path, description = "Test step ID")
    ),
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Step result; assertion failures are data, not errors", body = TestExecutionResult),
        (status = 404, description = "Step, case or environment not found"),
        (status = 409, description = "Environment of another project"),
        (status = 422, description = "Unresolved variable, circular template or malformed extraction")
    ),
    tag = "Execution"
)]
pub async fn execute_test_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ExecuteRequest>>,
) -> AppResult<Json<TestExecutionResult>> {
    let payload = body.map(|Json(p)| p).unwrap_or_default();

    let step = TestStepRepository::find_by_id(&state.db, id).await?;
    let case = TestCaseRepository::find_by_id(&state.db, step.test_case_id).await?;
    let project = ProjectRepository::find_by_id(&state.db, case.project_id).await?;
    let environment = select_environment(&state, case.project_id, payload.environment_id).await?;

    let result = CaseRunner::new(&state)
        .run_step(
            &project,
            &case,
            environment.as_ref(),
            &step,
            payload.into_options(),
        )
        .await?;
    Ok(Json(result))
}

/// Pick the explicit environment after checking it belongs to the project,
/// or fall back to the project default. Runs without any environment when
/// neither exists.
async fn select_environment(
    state: &AppState,
    project_id: Uuid,
    environment_id: Option<Uuid>,
) -> AppResult<Option<Environment>> {
    match environment_id {
        Some(id) => {
            let environment = EnvironmentRepository::find_by_id(&state.db, id).await?;
            if environment.project_id != project_id {
                return Err(AppError::Constraint(
                    "environment does not belong to the project of the test case".to_string(),
                ));
            }
            Ok(Some(environment))
        }
        None => EnvironmentRepository::find_default_by_project(&state.db, project_id).await,
    }
}
