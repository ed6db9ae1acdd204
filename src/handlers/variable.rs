use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::VariableScopeParams;
use crate::models::{ScopeKey, UpsertVariable, Variable, VariableScope};
use crate::services::template;
use crate::services::{RunContext, VariableStore};
use crate::state::AppState;

// ============ Request/Response DTOs ============

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariableRequest {
    pub name: String,
    pub value: serde_json::Value,
    pub scope: VariableScope,
    pub project_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    /// Encrypt the value at rest; reads return a masked placeholder
    #[serde(default)]
    pub is_encrypted: bool,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertVariableRequest {
    pub value: serde_json::Value,
    pub scope: VariableScope,
    pub project_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    #[serde(default)]
    pub is_encrypted: bool,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariableResponse {
    pub id: Uuid,
    pub name: String,
    /// Masked for encrypted variables
    pub value: serde_json::Value,
    pub scope: VariableScope,
    pub project_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub is_encrypted: bool,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub created_at: time::OffsetDateTime,
    #[schema(value_type = String)]
    pub updated_at: time::OffsetDateTime,
}

impl From<Variable> for VariableResponse {
    fn from(v: Variable) -> Self {
        Self {
            id: v.id,
            name: v.name,
            value: v.value,
            scope: v.scope,
            project_id: v.project_id,
            environment_id: v.environment_id,
            case_id: v.case_id,
            is_encrypted: v.is_encrypted,
            description: v.description,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariableListResponse {
    pub data: Vec<VariableResponse>,
    pub total: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessTemplateRequest {
    /// Any JSON value; placeholders resolve recursively inside it
    pub template: serde_json::Value,
    pub project_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    /// Highest-precedence values for this resolution only
    #[serde(default)]
    pub temp_variables: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessTemplateResponse {
    pub result: serde_json::Value,
}

// ============ Handlers ============

/// Create a scoped variable
#[utoipa::path(
    post,
    path = "/api/variables",
    request_body = CreateVariableRequest,
    responses(
        (status = 200, description = "Variable created successfully", body = VariableResponse),
        (status = 400, description = "Missing scope identifier"),
        (status = 404, description = "Owner not found"),
        (status = 409, description = "Duplicate name in scope or identifier foreign to the scope")
    ),
    tag = "Variables"
)]
pub async fn create_variable(
    State(state): State<AppState>,
    Json(payload): Json<CreateVariableRequest>,
) -> AppResult<Json<VariableResponse>> {
    let key = ScopeKey::from_parts(
        payload.scope,
        payload.project_id,
        payload.environment_id,
        payload.case_id,
    )?;
    let input = UpsertVariable {
        name: payload.name,
        value: payload.value,
        is_encrypted: payload.is_encrypted,
        description: payload.description,
    };

    let variable = VariableStore::new(&state)
        .create(&key, payload.project_id, &input)
        .await?;
    Ok(Json(variable.into()))
}

/// List the variables of one scope
#[utoipa::path(
    get,
    path = "/api/variables",
    params(VariableScopeParams),
    responses(
        (status = 200, description = "Variables of the scope, encrypted values masked", body = VariableListResponse),
        (status = 400, description = "Missing scope identifier"),
        (status = 409, description = "Identifier foreign to the scope")
    ),
    tag = "Variables"
)]
pub async fn list_variables(
    State(state): State<AppState>,
    Query(params): Query<VariableScopeParams>,
) -> AppResult<Json<VariableListResponse>> {
    let key = params.scope_key()?;
    let variables = VariableStore::new(&state).list(&key).await?;

    Ok(Json(VariableListResponse {
        total: variables.len(),
        data: variables.into_iter().map(|v| v.into()).collect(),
    }))
}

/// Get one variable by scope and name
#[utoipa::path(
    get,
    path = "/api/variables/{name}",
    params(
        ("name" = String, Path, description = "Variable name"),
        VariableScopeParams
    ),
    responses(
        (status = 200, description = "Variable details, encrypted value masked", body = VariableResponse),
        (status = 404, description = "Variable not found")
    ),
    tag = "Variables"
)]
pub async fn get_variable(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<VariableScopeParams>,
) -> AppResult<Json<VariableResponse>> {
    let key = params.scope_key()?;
    let variable = VariableStore::new(&state).get(&key, &name).await?;
    Ok(Json(variable.into()))
}

/// Create or replace a variable by scope and name
#[utoipa::path(
    put,
    path = "/api/variables/{name}",
    params(
        ("name" = String, Path, description = "Variable name")
    ),
    request_body = UpsertVariableRequest,
    responses(
        (status = 200, description = "Variable stored", body = VariableResponse),
        (status = 400, description = "Missing scope identifier"),
        (status = 404, description = "Owner not found")
    ),
    tag = "Variables"
)]
pub async fn upsert_variable(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<UpsertVariableRequest>,
) -> AppResult<Json<VariableResponse>> {
    let key = ScopeKey::from_parts(
        payload.scope,
        payload.project_id,
        payload.environment_id,
        payload.case_id,
    )?;
    let input = UpsertVariable {
        name,
        value: payload.value,
        is_encrypted: payload.is_encrypted,
        description: payload.description,
    };

    let variable = VariableStore::new(&state)
        .upsert(&key, payload.project_id, &input)
        .await?;
    Ok(Json(variable.into()))
}

/// Delete a variable by scope and name
#[utoipa::path(
    delete,
    path = "/api/variables/{name}",
    params(
        ("name" = String, Path, description = "Variable name"),
        VariableScopeParams
    ),
    responses(
        (status = 200, description = "Variable deleted"),
        (status = 404, description = "Variable not found")
    ),
    tag = "Variables"
)]
pub async fn delete_variable(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<VariableScopeParams>,
) -> AppResult<()> {
    let key = params.scope_key()?;
    VariableStore::new(&state).delete(&key, &name).await?;
    Ok(())
}

/// Resolve a template against the stored scopes without executing anything
#[utoipa::path(
    post,
    path = "/api/variables/process-template",
    request_body = ProcessTemplateRequest,
    responses(
        (status = 200, description = "Resolved template", body = ProcessTemplateResponse),
        (status = 409, description = "Identifiers point at different projects"),
        (status = 422, description = "Unresolved variable or circular reference")
    ),
    tag = "Variables"
)]
pub async fn process_template(
    State(state): State<AppState>,
    Json(payload): Json<ProcessTemplateRequest>,
) -> AppResult<Json<ProcessTemplateResponse>> {
    let chain = VariableStore::new(&state)
        .chain_for_selection(payload.project_id, payload.environment_id, payload.case_id)
        .await?;
    let ctx = RunContext::with_overlay(chain, payload.temp_variables);

    let result = template::resolve_value(&payload.template, &ctx)?;
    Ok(Json(ProcessTemplateResponse { result }))
}
