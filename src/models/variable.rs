use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub use crate::entity::variable::VariableScope;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: Uuid,
    pub name: String,
    pub value: serde_json::Value,
    pub scope: VariableScope,
    pub project_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub is_encrypted: bool,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Input for create/upsert operations on the variable store
#[derive(Debug, Clone)]
pub struct UpsertVariable {
    pub name: String,
    pub value: serde_json::Value,
    pub is_encrypted: bool,
    pub description: Option<String>,
}

/// A variable's owning bucket: the scope plus exactly the identifier that
/// scope needs. Invalid identifier combinations cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Global,
    Project { project_id: Uuid },
    Environment { environment_id: Uuid },
    Case { case_id: Uuid },
}

impl ScopeKey {
    /// Build a key from wire-level parts. A missing required identifier is a
    /// validation error; an identifier foreign to the scope is a constraint
    /// violation. `project_id` is accepted alongside environment/case scope
    /// (the owner row already knows its project) and verified at the store.
    pub fn from_parts(
        scope: VariableScope,
        project_id: Option<Uuid>,
        environment_id: Option<Uuid>,
        case_id: Option<Uuid>,
    ) -> AppResult<Self> {
        match scope {
            VariableScope::Global => {
                if project_id.is_some() || environment_id.is_some() || case_id.is_some() {
                    return Err(AppError::Constraint(
                        "global-scope variables take no owner identifiers".to_string(),
                    ));
                }
                Ok(ScopeKey::Global)
            }
            VariableScope::Project => {
                if environment_id.is_some() || case_id.is_some() {
                    return Err(AppError::Constraint(
                        "project-scope variables take only project_id".to_string(),
                    ));
                }
                let project_id = project_id.ok_or_else(|| {
                    AppError::Validation(
                        "project_id is required for project-scope variables".to_string(),
                    )
                })?;
                Ok(ScopeKey::Project { project_id })
            }
            VariableScope::Environment => {
                if case_id.is_some() {
                    return Err(AppError::Constraint(
                        "case_id is not applicable to environment-scope variables".to_string(),
                    ));
                }
                let environment_id = environment_id.ok_or_else(|| {
                    AppError::Validation(
                        "environment_id is required for environment-scope variables".to_string(),
                    )
                })?;
                Ok(ScopeKey::Environment { environment_id })
            }
            VariableScope::Case => {
                if environment_id.is_some() {
                    return Err(AppError::Constraint(
                        "environment_id is not applicable to case-scope variables".to_string(),
                    ));
                }
                let case_id = case_id.ok_or_else(|| {
                    AppError::Validation(
                        "case_id is required for case-scope variables".to_string(),
                    )
                })?;
                Ok(ScopeKey::Case { case_id })
            }
        }
    }

    pub fn scope(&self) -> VariableScope {
        match self {
            ScopeKey::Global => VariableScope::Global,
            ScopeKey::Project { .. } => VariableScope::Project,
            ScopeKey::Environment { .. } => VariableScope::Environment,
            ScopeKey::Case { .. } => VariableScope::Case,
        }
    }

    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            ScopeKey::Project { project_id } => Some(*project_id),
            _ => None,
        }
    }

    pub fn environment_id(&self) -> Option<Uuid> {
        match self {
            ScopeKey::Environment { environment_id } => Some(*environment_id),
            _ => None,
        }
    }

    pub fn case_id(&self) -> Option<Uuid> {
        match self {
            ScopeKey::Case { case_id } => Some(*case_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_key_rejects_owner_identifiers() {
        let err = ScopeKey::from_parts(
            VariableScope::Global,
            Some(Uuid::new_v4()),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Constraint(_)));
    }

    #[test]
    fn project_key_requires_project_id() {
        let err = ScopeKey::from_parts(VariableScope::Project, None, None, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let id = Uuid::new_v4();
        let key = ScopeKey::from_parts(VariableScope::Project, Some(id), None, None).unwrap();
        assert_eq!(key, ScopeKey::Project { project_id: id });
    }

    #[test]
    fn environment_key_allows_redundant_project_id() {
        let env_id = Uuid::new_v4();
        let key = ScopeKey::from_parts(
            VariableScope::Environment,
            Some(Uuid::new_v4()),
            Some(env_id),
            None,
        )
        .unwrap();
        assert_eq!(
            key,
            ScopeKey::Environment {
                environment_id: env_id
            }
        );
    }

    #[test]
    fn case_key_rejects_environment_id() {
        let err = ScopeKey::from_parts(
            VariableScope::Case,
            None,
            Some(Uuid::new_v4()),
            Some(Uuid::new_v4()),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Constraint(_)));
    }
}
