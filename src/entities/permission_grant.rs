use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A permission grant attaching one permission kind to a principal.
///
/// Grants are never deleted: they are revoked or left to expire, so the
/// table doubles as an audit trail. A grant is active when `revoked` is
/// zero and `expires_at` is null or still in the future.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "permission_grants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub kind: String,
    pub expires_at: Option<i64>,
    pub revoked: i64,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
