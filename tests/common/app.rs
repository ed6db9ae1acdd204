use axum_test::TestServer;
use reqwest::Client;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use tokio::sync::watch;

use caseflow::build_router;
use caseflow::entity;
use caseflow::services::sql::DEFAULT_SOURCE;
use caseflow::services::{SqlPool, ValueCipher};
use caseflow::state::AppState;

/// Test application wrapper
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    /// Flip to true to cancel in-flight runs
    pub shutdown: watch::Sender<bool>,
    /// The "default" data source step SQL queries run against
    pub sql_target: DatabaseConnection,
}

impl TestApp {
    /// Create a new test application on an in-memory store
    pub async fn new() -> Self {
        let db = connect_memory_db().await;
        create_schema(&db).await;

        // A second in-memory database plays the system under test
        let sql_target = connect_memory_db().await;
        let mut sql = SqlPool::default();
        sql.register(DEFAULT_SOURCE, sql_target.clone());

        let (shutdown, shutdown_rx) = watch::channel(false);

        let state = AppState {
            db,
            sql,
            cipher: ValueCipher::new("caseflow-test-secret"),
            http: Client::new(),
            shutdown: shutdown_rx,
        };

        let router = build_router(state.clone());
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            shutdown,
            sql_target,
        }
    }
}

/// One-connection pool, so every query sees the same in-memory database
async fn connect_memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);

    Database::connect(opt)
        .await
        .expect("Failed to open in-memory database")
}

async fn create_schema(db: &DatabaseConnection) {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        backend.build(&schema.create_table_from_entity(entity::project::Entity)),
        backend.build(&schema.create_table_from_entity(entity::environment::Entity)),
        backend.build(&schema.create_table_from_entity(entity::test_case::Entity)),
        backend.build(&schema.create_table_from_entity(entity::test_step::Entity)),
        backend.build(&schema.create_table_from_entity(entity::variable::Entity)),
    ];
    for statement in tables {
        db.execute(statement).await.expect("Failed to create table");
    }
}
