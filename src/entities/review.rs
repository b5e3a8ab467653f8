use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One rating per (material, user) pair, upserted on re-submission.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub info_mat_id: i32,
    pub user_id: i32,
    pub rating: f64,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
