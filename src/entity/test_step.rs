use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_steps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub test_case_id: Uuid,
    pub name: String,
    /// Absolute, or relative to the project base_url; empty for SQL-only steps
    pub url: String,
    pub method: String,
    #[sea_orm(column_type = "Json")]
    pub headers: Json,
    #[sea_orm(column_type = "Json")]
    pub params: Json,
    #[sea_orm(column_type = "Json")]
    pub body: Json,
    /// Form field name -> file path; a step with files sends multipart
    #[sea_orm(column_type = "Json")]
    pub files: Json,
    #[sea_orm(column_type = "Json")]
    pub auth: Json,
    /// Variable name -> extraction path into the response document
    #[sea_orm(column_type = "Json")]
    pub extract: Json,
    /// Ordered list of validation rules
    #[sea_orm(column_type = "Json")]
    pub validate: Json,
    /// Ordered list of SQL cross-check queries
    #[sea_orm(column_type = "Json")]
    pub sql_queries: Json,
    /// Seconds per attempt
    pub timeout: i32,
    /// Extra attempts on transport failure
    pub retry: i32,
    /// Seconds between attempts
    pub retry_interval: i32,
    /// Unique within a case, defines execution sequence
    pub order: i32,
    pub status: i32,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::test_case::Entity",
        from = "Column::TestCaseId",
        to = "super::test_case::Column::Id"
    )]
    TestCase,
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
