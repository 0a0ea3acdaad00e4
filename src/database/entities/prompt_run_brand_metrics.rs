use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-run brand mention aggregate. `brand_key` is the lowercased brand
/// name; `brand_display` keeps the first-seen casing.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prompt_run_brand_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub main_brand_id: Uuid,
    pub prompt_run_id: Uuid,
    pub brand_key: String,
    pub brand_display: String,
    pub is_main: bool,
    pub mentions: i32,
    pub sentiment: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
