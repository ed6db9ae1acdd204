use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Granularity level at which a variable is defined, most general to most
/// specific: global, project, environment, case.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    #[sea_orm(string_value = "global")]
    Global,
    #[sea_orm(string_value = "project")]
    Project,
    #[sea_orm(string_value = "environment")]
    Environment,
    #[sea_orm(string_value = "case")]
    Case,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique within the composite key (scope, owning identifier)
    pub name: String,
    /// Arbitrary JSON; ciphertext token when `is_encrypted`
    #[sea_orm(column_type = "Json")]
    pub value: Json,
    pub scope: VariableScope,
    pub project_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub is_encrypted: bool,
    pub description: Option<String>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(
        belongs_to = "super::environment::Entity",
        from = "Column::EnvironmentId",
        to = "super::environment::Column::Id"
    )]
    Environment,
    #[sea_orm(
        belongs_to = "super::test_case::Entity",
        from = "Column::CaseId",
        to = "super::test_case::Column::Id"
    )]
    TestCase,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::environment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Environment.def()
    }
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
