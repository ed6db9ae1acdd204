use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ScopeKey, VariableScope};

/// Scope selector shared by the variable endpoints. `scope` names the
/// bucket; exactly the identifier that scope requires must accompany it.
/// A redundant `project_id` next to an environment or case identifier is
/// tolerated, matching `ScopeKey::from_parts`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct VariableScopeParams {
    pub scope: VariableScope,
    pub project_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
}

impl VariableScopeParams {
    pub fn scope_key(&self) -> AppResult<ScopeKey> {
        ScopeKey::from_parts(
            self.scope,
            self.project_id,
            self.environment_id,
            self.case_id,
        )
    }
}
