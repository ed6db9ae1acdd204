use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::entity::project::{self, ActiveModel, Entity as ProjectEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CreateProject, Project, STATUS_ENABLED};
use crate::repositories::Repository;

/// Project repository for database operations
pub struct ProjectRepository;

#[async_trait]
impl Repository<Project> for ProjectRepository {
    async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Project> {
        let model = ProjectEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

        Ok(model.into())
    }

    async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
        let result = ProjectEntity::delete_by_id(id).exec(db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Project".to_string()));
        }

        Ok(())
    }
}

impl ProjectRepository {
    /// Create a new project
    pub async fn create(db: &DatabaseConnection, input: &CreateProject) -> AppResult<Project> {
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            base_url: Set(input.base_url.clone()),
            headers: Set(input.headers.clone().unwrap_or_else(|| serde_json::json!({}))),
            variables: Set(input.variables.clone().unwrap_or_else(|| serde_json::json!({}))),
            status: Set(STATUS_ENABLED),
            created_at: Set(time::OffsetDateTime::now_utc()),
            updated_at: Set(time::OffsetDateTime::now_utc()),
        };

        let result = model.insert(db).await?;
        Ok(result.into())
    }
}

// Conversion from SeaORM model to our domain model
impl From<project::Model> for Project {
    fn from(m: project::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            base_url: m.base_url,
            headers: m.headers,
            variables: m.variables,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
