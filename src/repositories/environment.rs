use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entity::environment::{self, ActiveModel, Column, Entity as EnvironmentEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CreateEnvironment, Environment, STATUS_DISABLED, STATUS_ENABLED};
use crate::repositories::Repository;

/// Environment repository for database operations
pub struct EnvironmentRepository;

#[async_trait]
impl Repository<Environment> for EnvironmentRepository {
    async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Environment> {
        let model = EnvironmentEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Environment".to_string()))?;

        Ok(model.into())
    }

    async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
        let result = EnvironmentEntity::delete_by_id(id).exec(db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Environment".to_string()));
        }

        Ok(())
    }
}

impl EnvironmentRepository {
    /// Create a new environment. Freshly created environments are never the
    /// default; promotion goes through [`Self::set_default`].
    pub async fn create(
        db: &DatabaseConnection,
        project_id: Uuid,
        input: &CreateEnvironment,
    ) -> AppResult<Environment> {
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            variables: Set(input.variables.clone().unwrap_or_else(|| serde_json::json!({}))),
            is_default: Set(false),
            status: Set(input.status.unwrap_or(STATUS_ENABLED)),
            created_at: Set(time::OffsetDateTime::now_utc()),
            updated_at: Set(time::OffsetDateTime::now_utc()),
        };

        let result = model.insert(db).await?;
        Ok(result.into())
    }

    /// Find the default environment of a project, if one has been designated
    pub async fn find_default_by_project(
        db: &DatabaseConnection,
        project_id: Uuid,
    ) -> AppResult<Option<Environment>> {
        let model = EnvironmentEntity::find()
            .filter(Column::ProjectId.eq(project_id))
            .filter(Column::IsDefault.eq(true))
            .one(db)
            .await?;

        Ok(model.map(|m| m.into()))
    }

    /// Make one environment the default for its project.
    ///
    /// Clears the flag on every sibling and sets it on the given environment
    /// inside a single transaction, so a project never observes two defaults.
    pub async fn set_default(db: &DatabaseConnection, id: Uuid) -> AppResult<Environment> {
        let txn = db.begin().await?;

        let model = EnvironmentEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Environment".to_string()))?;

        if model.status == STATUS_DISABLED {
            return Err(AppError::Constraint(
                "cannot set a disabled environment as default".to_string(),
            ));
        }

        EnvironmentEntity::update_many()
            .col_expr(Column::IsDefault, Expr::value(false))
            .filter(Column::ProjectId.eq(model.project_id))
            .filter(Column::IsDefault.eq(true))
            .exec(&txn)
            .await?;

        let mut active: ActiveModel = model.into();
        active.is_default = Set(true);
        active.updated_at = Set(time::OffsetDateTime::now_utc());
        let result = active.update(&txn).await?;

        txn.commit().await?;
        Ok(result.into())
    }
}

// Conversion from SeaORM model to our domain model
impl From<environment::Model> for Environment {
    fn from(m: environment::Model) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            name: m.name,
            description: m.description,
            variables: m.variables,
            is_default: m.is_default,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
