use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{StepOrder, TestStep};
use crate::repositories::TestStepRepository;
use crate::state::AppState;

// ============ Request/Response DTOs ============

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderStepsRequest {
    pub step_orders: Vec<StepOrder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestStepResponse {
    pub id: Uuid,
    pub test_case_id: Uuid,
    pub name: String,
    pub url: String,
    pub method: String,
    pub order: i32,
    pub status: i32,
    #[schema(value_type = String)]
    pub updated_at: time::OffsetDateTime,
}

impl From<TestStep> for TestStepResponse {
    fn from(s: TestStep) -> Self {
        Self {
            id: s.id,
            test_case_id: s.test_case_id,
            name: s.name,
            url: s.url,
            method: s.method,
            order: s.order,
            status: s.status,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestStepListResponse {
    pub data: Vec<TestStepResponse>,
    pub total: usize,
}

// ============ Handlers ============

/// Reassign step orders within one test case, all or nothing
#[utoipa::path(
    post,
    path = "/api/test_steps/reorder",
    request_body = ReorderStepsRequest,
    responses(
        (status = 200, description = "Every step of the case in its new order", body = TestStepListResponse),
        (status = 400, description = "Empty batch or negative order"),
        (status = 404, description = "Unknown step"),
        (status = 409, description = "Duplicate order or steps of different cases")
    ),
    tag = "Test Steps"
)]
pub async fn reorder_steps(
    State(state): State<AppState>,
    Json(payload): Json<ReorderStepsRequest>,
) -> AppResult<Json<TestStepListResponse>> {
    let steps = TestStepRepository::reorder(&state.db, &payload.step_orders).await?;

    Ok(Json(TestStepListResponse {
        total: steps.len(),
        data: steps.into_iter().map(|s| s.into()).collect(),
    }))
}
