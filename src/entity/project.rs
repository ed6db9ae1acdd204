use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Base URL that relative step URLs are joined onto
    pub base_url: String,
    /// Default request headers merged beneath step headers
    #[sea_orm(column_type = "Json")]
    pub headers: Json,
    /// Project-scope variable defaults, shadowed by explicit variable rows
    #[sea_orm(column_type = "Json")]
    pub variables: Json,
    pub status: i32,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::environment::Entity")]
    Environments,
    #[sea_orm(has_many = "super::test_case::Entity")]
    TestCases,
}

impl Related<super::environment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Environments.def()
    }
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
