use std::collections::HashMap;

use sea_orm::DatabaseConnection;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Environment, Project, ScopeKey, UpsertVariable, Variable};
use crate::repositories::{
    EnvironmentRepository, ProjectRepository, Repository, TestCaseRepository, VariableRepository,
};
use crate::services::crypto::{ValueCipher, MASKED_VALUE};
use crate::services::template::ScopeChain;
use crate::state::AppState;

/// Scoped variable CRUD plus scope-chain assembly.
///
/// All values pass through here: encryption before a row is written,
/// decryption when a chain is loaded for resolution, masking on anything
/// returned to a caller.
pub struct VariableStore {
    db: DatabaseConnection,
    cipher: ValueCipher,
}

impl VariableStore {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            cipher: state.cipher.clone(),
        }
    }

    /// Create a variable; a name already present under the key is a conflict
    pub async fn create(
        &self,
        key: &ScopeKey,
        project_hint: Option<Uuid>,
        input: &UpsertVariable,
    ) -> AppResult<Variable> {
        self.verify_owner(key, project_hint).await?;

        if VariableRepository::find_by_key(&self.db, key, &input.name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Variable '{}' in this scope",
                input.name
            )));
        }

        let value = self.stored_value(input)?;
        let variable = VariableRepository::insert(
            &self.db,
            key,
            &input.name,
            value,
            input.is_encrypted,
            input.description.clone(),
        )
        .await?;

        Ok(Self::masked(variable))
    }

    /// Create or replace a variable under the key
    pub async fn upsert(
        &self,
        key: &ScopeKey,
        project_hint: Option<Uuid>,
        input: &UpsertVariable,
    ) -> AppResult<Variable> {
        self.verify_owner(key, project_hint).await?;

        let value = self.stored_value(input)?;
        let variable = match VariableRepository::find_by_key(&self.db, key, &input.name).await? {
            Some(existing) => {
                VariableRepository::update(
                    &self.db,
                    existing.id,
                    value,
                    input.is_encrypted,
                    input.description.clone(),
                )
                .await?
            }
            None => {
                VariableRepository::insert(
                    &self.db,
                    key,
                    &input.name,
                    value,
                    input.is_encrypted,
                    input.description.clone(),
                )
                .await?
            }
        };

        Ok(Self::masked(variable))
    }

    /// Fetch one variable; encrypted values come back masked
    pub async fn get(&self, key: &ScopeKey, name: &str) -> AppResult<Variable> {
        let variable = VariableRepository::find_by_key(&self.db, key, name)
            .await?
            .ok_or_else(|| AppError::NotFound("Variable".to_string()))?;

        Ok(Self::masked(variable))
    }

    /// List the variables under a key, masked, ordered by name
    pub async fn list(&self, key: &ScopeKey) -> AppResult<Vec<Variable>> {
        let variables = VariableRepository::list_by_key(&self.db, key).await?;
        Ok(variables.into_iter().map(Self::masked).collect())
    }

    /// Delete one variable under the key
    pub async fn delete(&self, key: &ScopeKey, name: &str) -> AppResult<()> {
        VariableRepository::delete_by_key(&self.db, key, name).await
    }

    /// Assemble the precedence chain for a run or template call, decrypting
    /// stored rows. Explicit variable rows shadow the embedded bags of their
    /// level; the caller has already checked that the pieces belong together.
    pub async fn load_chain(
        &self,
        project: Option<&Project>,
        environment: Option<&Environment>,
        case_id: Option<Uuid>,
    ) -> AppResult<ScopeChain> {
        let mut chain = ScopeChain::new();

        if let Some(case_id) = case_id {
            let rows =
                VariableRepository::list_by_key(&self.db, &ScopeKey::Case { case_id }).await?;
            chain.push_layer("case", self.decrypt_rows(rows)?);
        }

        if let Some(environment) = environment {
            let key = ScopeKey::Environment {
                environment_id: environment.id,
            };
            let rows = VariableRepository::list_by_key(&self.db, &key).await?;
            chain.push_layer("environment", self.decrypt_rows(rows)?);
            chain.push_layer("environment defaults", Self::bag_values(&environment.variables));
        }

        if let Some(project) = project {
            let key = ScopeKey::Project {
                project_id: project.id,
            };
            let rows = VariableRepository::list_by_key(&self.db, &key).await?;
            chain.push_layer("project", self.decrypt_rows(rows)?);
            chain.push_layer("project defaults", Self::bag_values(&project.variables));
        }

        let rows = VariableRepository::list_by_key(&self.db, &ScopeKey::Global).await?;
        chain.push_layer("global", self.decrypt_rows(rows)?);

        Ok(chain)
    }

    /// Load the chain from raw identifiers, deriving the project from the
    /// environment or case when it is not given explicitly. Identifier
    /// combinations that point at different projects are rejected.
    pub async fn chain_for_selection(
        &self,
        project_id: Option<Uuid>,
        environment_id: Option<Uuid>,
        case_id: Option<Uuid>,
    ) -> AppResult<ScopeChain> {
        let case = match case_id {
            Some(id) => Some(TestCaseRepository::find_by_id(&self.db, id).await?),
            None => None,
        };
        let environment = match environment_id {
            Some(id) => Some(EnvironmentRepository::find_by_id(&self.db, id).await?),
            None => None,
        };

        if let (Some(case), Some(environment)) = (&case, &environment) {
            if case.project_id != environment.project_id {
                return Err(AppError::Constraint(
                    "environment and test case belong to different projects".to_string(),
                ));
            }
        }
        if let (Some(project_id), Some(case)) = (project_id, &case) {
            if case.project_id != project_id {
                return Err(AppError::Constraint(
                    "test case does not belong to the given project".to_string(),
                ));
            }
        }
        if let (Some(project_id), Some(environment)) = (project_id, &environment) {
            if environment.project_id != project_id {
                return Err(AppError::Constraint(
                    "environment does not belong to the given project".to_string(),
                ));
            }
        }

        let effective_project_id = project_id
            .or(case.as_ref().map(|c| c.project_id))
            .or(environment.as_ref().map(|e| e.project_id));
        let project = match effective_project_id {
            Some(id) => Some(ProjectRepository::find_by_id(&self.db, id).await?),
            None => None,
        };

        self.load_chain(project.as_ref(), environment.as_ref(), case_id)
            .await
    }

    /// Write extracted run values back as case-scope variables. Existing
    /// rows keep their encryption flag; new names arrive unencrypted.
    pub async fn promote_case_variables(
        &self,
        case_id: Uuid,
        values: &HashMap<String, Value>,
    ) -> AppResult<()> {
        let key = ScopeKey::Case { case_id };

        for (name, value) in values {
            match VariableRepository::find_by_key(&self.db, &key, name).await? {
                Some(existing) => {
                    let stored = if existing.is_encrypted {
                        self.cipher.encrypt_value(value)?
                    } else {
                        value.clone()
                    };
                    VariableRepository::update(
                        &self.db,
                        existing.id,
                        stored,
                        existing.is_encrypted,
                        existing.description,
                    )
                    .await?;
                }
                None => {
                    VariableRepository::insert(
                        &self.db,
                        &key,
                        name,
                        value.clone(),
                        false,
                        None,
                    )
                    .await?;
                }
            }
        }

        Ok(())
    }

    /// Writes must point at a real owner; a project hint supplied alongside
    /// an environment or case key must agree with the owner's project.
    async fn verify_owner(&self, key: &ScopeKey, project_hint: Option<Uuid>) -> AppResult<()> {
        match key {
            ScopeKey::Global => Ok(()),
            ScopeKey::Project { project_id } => {
                ProjectRepository::find_by_id(&self.db, *project_id).await?;
                Ok(())
            }
            ScopeKey::Environment { environment_id } => {
                let environment =
                    EnvironmentRepository::find_by_id(&self.db, *environment_id).await?;
                if let Some(hint) = project_hint {
                    if environment.project_id != hint {
                        return Err(AppError::Constraint(
                            "environment does not belong to the given project".to_string(),
                        ));
                    }
                }
                Ok(())
            }
            ScopeKey::Case { case_id } => {
                let case = TestCaseRepository::find_by_id(&self.db, *case_id).await?;
                if let Some(hint) = project_hint {
                    if case.project_id != hint {
                        return Err(AppError::Constraint(
                            "test case does not belong to the given project".to_string(),
                        ));
                    }
                }
                Ok(())
            }
        }
    }

    fn stored_value(&self, input: &UpsertVariable) -> AppResult<Value> {
        if input.is_encrypted {
            self.cipher.encrypt_value(&input.value)
        } else {
            Ok(input.value.clone())
        }
    }

    fn decrypt_rows(&self, rows: Vec<Variable>) -> AppResult<HashMap<String, Value>> {
        let mut values = HashMap::with_capacity(rows.len());
        for row in rows {
            let value = if row.is_encrypted {
                self.cipher.decrypt_value(&row.value)?
            } else {
                row.value
            };
            values.insert(row.name, value);
        }
        Ok(values)
    }

    fn bag_values(bag: &Value) -> HashMap<String, Value> {
        match bag.as_object() {
            Some(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => HashMap::new(),
        }
    }

    fn masked(mut variable: Variable) -> Variable {
        if variable.is_encrypted {
            variable.value = Value::String(MASKED_VALUE.to_string());
        }
        variable
    }
}
