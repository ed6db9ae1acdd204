use tokio::signal;
use tokio::sync::watch;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use caseflow::config::Config;
use caseflow::handlers::{
    CreateVariableRequest, EnvironmentResponse, ExecuteRequest, ProcessTemplateRequest,
    ProcessTemplateResponse, ReorderStepsRequest, TestStepListResponse, TestStepResponse,
    UpsertVariableRequest, VariableListResponse, VariableResponse,
};
use caseflow::models::{
    Operator, RunStatus, SqlQuery, StepOrder, StepStatus, TestExecutionResult, TestReport,
    ValidationOutcome, ValidationRule, VariableScope,
};
use caseflow::state::AppState;
use caseflow::{build_router, handlers};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::environment::set_default_environment,
        handlers::environment::get_default_environment,
        handlers::variable::create_variable,
        handlers::variable::list_variables,
        handlers::variable::get_variable,
        handlers::variable::upsert_variable,
        handlers::variable::delete_variable,
        handlers::variable::process_template,
        handlers::execute::execute_test_case,
        handlers::execute::execute_test_step,
        handlers::step::reorder_steps,
    ),
    components(schemas(
        EnvironmentResponse,
        CreateVariableRequest,
        UpsertVariableRequest,
        VariableResponse,
        VariableListResponse,
        ProcessTemplateRequest,
        ProcessTemplateResponse,
        ExecuteRequest,
        ReorderStepsRequest,
        TestStepResponse,
        TestStepListResponse,
        TestReport,
        TestExecutionResult,
        ValidationOutcome,
        ValidationRule,
        Operator,
        SqlQuery,
        StepOrder,
        StepStatus,
        RunStatus,
        VariableScope,
    )),
    tags(
        (name = "Environments", description = "Default environment selection"),
        (name = "Variables", description = "Scoped variables and template resolution"),
        (name = "Execution", description = "Run test cases and single steps"),
        (name = "Test Steps", description = "Step order maintenance")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    let addr = config.server_addr();

    // Runs watch this channel and stop issuing steps once it flips
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Initialize application state (connects to the store and data sources)
    tracing::info!("Connecting to databases...");
    let state = AppState::new(&config, shutdown_rx)
        .await
        .expect("Failed to initialize application state");
    tracing::info!("Database connections established");

    // Build the main application router
    let app = build_router(state)
        // Add Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    tracing::info!("Server started on http://{}", addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .unwrap();
}

/// Wait for ctrl-c, then tell in-flight runs to wind down before the
/// listener closes
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    tracing::info!("Shutdown requested, in-flight steps may finish");
    let _ = shutdown_tx.send(true);
}
