use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::variable::{self, ActiveModel, Column, Entity as VariableEntity};
use crate::error::{AppError, AppResult};
use crate::models::{ScopeKey, Variable};

/// Variable repository for database operations.
///
/// Variables are addressed by `(scope key, name)` rather than by id; values
/// arrive here already encrypted when the caller asked for encryption.
pub struct VariableRepository;

impl VariableRepository {
    /// Find one variable under a scope key
    pub async fn find_by_key(
        db: &DatabaseConnection,
        key: &ScopeKey,
        name: &str,
    ) -> AppResult<Option<Variable>> {
        let model = VariableEntity::find()
            .filter(Self::key_condition(key))
            .filter(Column::Name.eq(name))
            .one(db)
            .await?;

        Ok(model.map(|m| m.into()))
    }

    /// List all variables under a scope key, ordered by name
    pub async fn list_by_key(db: &DatabaseConnection, key: &ScopeKey) -> AppResult<Vec<Variable>> {
        let models = VariableEntity::find()
            .filter(Self::key_condition(key))
            .order_by_asc(Column::Name)
            .all(db)
            .await?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    /// Insert a new variable row under a scope key
    pub async fn insert(
        db: &DatabaseConnection,
        key: &ScopeKey,
        name: &str,
        value: serde_json::Value,
        is_encrypted: bool,
        description: Option<String>,
    ) -> AppResult<Variable> {
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            value: Set(value),
            scope: Set(key.scope()),
            project_id: Set(key.project_id()),
            environment_id: Set(key.environment_id()),
            case_id: Set(key.case_id()),
            is_encrypted: Set(is_encrypted),
            description: Set(description),
            created_at: Set(time::OffsetDateTime::now_utc()),
            updated_at: Set(time::OffsetDateTime::now_utc()),
        };

        let result = model.insert(db).await?;
        Ok(result.into())
    }

    /// Replace the value, encryption flag and description of an existing row
    pub async fn update(
        db: &DatabaseConnection,
        id: Uuid,
        value: serde_json::Value,
        is_encrypted: bool,
        description: Option<String>,
    ) -> AppResult<Variable> {
        let model = VariableEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Variable".to_string()))?;

        let mut active: ActiveModel = model.into();
        active.value = Set(value);
        active.is_encrypted = Set(is_encrypted);
        active.description = Set(description);
        active.updated_at = Set(time::OffsetDateTime::now_utc());

        let result = active.update(db).await?;
        Ok(result.into())
    }

    /// Delete one variable under a scope key
    pub async fn delete_by_key(
        db: &DatabaseConnection,
        key: &ScopeKey,
        name: &str,
    ) -> AppResult<()> {
        let result = VariableEntity::delete_many()
            .filter(Self::key_condition(key))
            .filter(Column::Name.eq(name))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Variable".to_string()));
        }

        Ok(())
    }

    fn key_condition(key: &ScopeKey) -> Condition {
        let base = Condition::all().add(Column::Scope.eq(key.scope()));
        match key {
            ScopeKey::Global => base,
            ScopeKey::Project { project_id } => base.add(Column::ProjectId.eq(*project_id)),
            ScopeKey::Environment { environment_id } => {
                base.add(Column::EnvironmentId.eq(*environment_id))
            }
            ScopeKey::Case { case_id } => base.add(Column::CaseId.eq(*case_id)),
        }
    }
}

// Conversion from SeaORM model to our domain model
impl From<variable::Model> for Variable {
    fn from(m: variable::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            value: m.value,
            scope: m.scope,
            project_id: m.project_id,
            environment_id: m.environment_id,
            case_id: m.case_id,
            is_encrypted: m.is_encrypted,
            description: m.description,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
