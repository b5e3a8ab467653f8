use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A catalog record for a library material. List-valued fields (`authors`,
/// `matters`, `sub_matters`, `tags`) are stored as serialized JSON text.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "info_mats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub authors: String,
    pub publication_year: String,
    pub cover_image: String,
    #[sea_orm(column_name = "abstract")]
    pub abstract_text: String,
    pub matters: String,
    pub sub_matters: Option<String>,
    pub availability: Option<String>,
    pub address: Option<String>,
    pub summary: Option<String>,
    pub tags: String,
    pub number_of_pages: String,
    pub isbn: String,
    pub issn: String,
    pub material_type: String,
    pub language: String,
    pub publisher: String,
    pub volume: i32,
    pub series: String,
    pub edition: String,
    pub reprint_update: String,
    pub number_of_hits: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
