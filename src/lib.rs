// Library crate for Caseflow
// Exports modules for use by the test suites

pub mod config;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_variable, delete_variable, execute_test_case, execute_test_step,
    get_default_environment, get_variable, list_variables, process_template, reorder_steps,
    set_default_environment, upsert_variable,
};
use crate::state::AppState;

/// Build the application router with the given state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Hello, Caseflow!" }))
        // Environment routes
        .route(
            "/api/environments/{id}/default",
            post(set_default_environment),
        )
        .route(
            "/api/projects/{project_id}/environments/default",
            get(get_default_environment),
        )
        // Variable routes
        .route("/api/variables", post(create_variable))
        .route("/api/variables", get(list_variables))
        .route("/api/variables/process-template", post(process_template))
        .route("/api/variables/{name}", get(get_variable))
        .route("/api/variables/{name}", put(upsert_variable))
        .route("/api/variables/{name}", delete(delete_variable))
        // Execution routes
        .route("/api/test_cases/{id}/execute", post(execute_test_case))
        .route("/api/test_steps/{id}/execute", post(execute_test_step))
        // Step order maintenance
        .route("/api/test_steps/reorder", post(reorder_steps))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
