use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::entity::test_case::{self, ActiveModel, Entity as TestCaseEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CreateTestCase, TestCase, STATUS_ENABLED};
use crate::repositories::Repository;

/// Test case repository for database operations
pub struct TestCaseRepository;

#[async_trait]
impl Repository<TestCase> for TestCaseRepository {
    async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<TestCase> {
        let model = TestCaseEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Test case".to_string()))?;

        Ok(model.into())
    }

    async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
        let result = TestCaseEntity::delete_by_id(id).exec(db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Test case".to_string()));
        }

        Ok(())
    }
}

impl TestCaseRepository {
    /// Create a new test case
    pub async fn create(
        db: &DatabaseConnection,
        project_id: Uuid,
        input: &CreateTestCase,
    ) -> AppResult<TestCase> {
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            pre_script: Set(input.pre_script.clone()),
            post_script: Set(input.post_script.clone()),
            continue_on_failure: Set(input.continue_on_failure.unwrap_or(true)),
            status: Set(input.status.unwrap_or(STATUS_ENABLED)),
            created_at: Set(time::OffsetDateTime::now_utc()),
            updated_at: Set(time::OffsetDateTime::now_utc()),
        };

        let result = model.insert(db).await?;
        Ok(result.into())
    }
}

// Conversion from SeaORM model to our domain model
impl From<test_case::Model> for TestCase {
    fn from(m: test_case::Model) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            name: m.name,
            description: m.description,
            pre_script: m.pre_script,
            post_script: m.post_script,
            continue_on_failure: m.continue_on_failure,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
