use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One completed visibility probe. Created exactly once per successful
/// classification, never mutated afterward.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prompts_run")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub brand_id: Uuid,
    pub run_date: Date,
    pub sentiment: String,
    pub provider: String,
    #[sea_orm(column_type = "Text")]
    pub response_text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
