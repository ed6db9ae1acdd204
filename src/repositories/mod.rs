pub mod environment;
pub mod project;
pub mod test_case;
pub mod test_step;
pub mod variable;

pub use environment::EnvironmentRepository;
pub use project::ProjectRepository;
pub use test_case::TestCaseRepository;
pub use test_step::TestStepRepository;
pub use variable::VariableRepository;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::error::AppResult;

/// Base repository trait for operations shared by all id-keyed entities
#[async_trait]
pub trait Repository<T>
where
    T: Send + Sync,
{
    /// Find entity by ID
    async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<T>;

    /// Delete entity by ID
    async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()>;
}
