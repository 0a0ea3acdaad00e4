use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discovered competitor brand. Insert-if-absent on (main_brand_id,
/// brand_key); never updated even if display name or domain later differ.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competitors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub main_brand_id: Uuid,
    pub brand_key: String,
    pub brand_display: String,
    pub domain: String,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
