use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Environment;
use crate::repositories::{EnvironmentRepository, ProjectRepository, Repository};
use crate::state::AppState;

// ============ Request/Response DTOs ============

#[derive(Debug, Serialize, ToSchema)]
pub struct EnvironmentResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub variables: serde_json::Value,
    pub is_default: bool,
    pub status: i32,
    #[schema(value_type = String)]
    pub created_at: time::OffsetDateTime,
    #[schema(value_type = String)]
    pub updated_at: time::OffsetDateTime,
}

impl From<Environment> for EnvironmentResponse {
    fn from(e: Environment) -> Self {
        Self {
            id: e.id,
            project_id: e.project_id,
            name: e.name,
            description: e.description,
            variables: e.variables,
            is_default: e.is_default,
            status: e.status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

// ============ Handlers ============

/// Make an environment the default of its project
#[utoipa::path(
    post,
    path = "/api/environments/{id}/default",
    params(
        ("id" = Uuid, Path, description = "Environment ID")
    ),
    responses(
        (status = 200, description = "Environment is now the default", body = EnvironmentResponse),
        (status = 404, description = "Environment not found"),
        (status = 409, description = "Environment is disabled")
    ),
    tag = "Environments"
)]
pub async fn set_default_environment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EnvironmentResponse>> {
    let environment = EnvironmentRepository::set_default(&state.db, id).await?;
    Ok(Json(environment.into()))
}

/// Get the default environment of a project
#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/environments/default",
    params(
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Default environment", body = EnvironmentResponse),
        (status = 404, description = "Project not found or no default configured")
    ),
    tag = "Environments"
)]
pub async fn get_default_environment(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<EnvironmentResponse>> {
    ProjectRepository::find_by_id(&state.db, project_id).await?;

    let environment = EnvironmentRepository::find_default_by_project(&state.db, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Default environment".to_string()))?;
    Ok(Json(environment.into()))
}
