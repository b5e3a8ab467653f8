//! Enumerated mapping from wire field names to catalog columns.
//!
//! Field resolution is a closed enumeration checked at compile time; a name
//! outside it fails with [`QueryError::UnknownField`] instead of reaching
//! into arbitrary model attributes.

use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr};

use crate::entities::info_mat;
use crate::query::errors::QueryError;

/// A queryable column of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    Title,
    Authors,
    PublicationYear,
    CoverImage,
    Abstract,
    Matters,
    SubMatters,
    Availability,
    Address,
    Summary,
    Tags,
    NumberOfPages,
    Isbn,
    Issn,
    MaterialType,
    Language,
    Publisher,
    Volume,
    Series,
    Edition,
    ReprintUpdate,
}

impl CatalogField {
    pub const ALL: [CatalogField; 21] = [
        CatalogField::Title,
        CatalogField::Authors,
        CatalogField::PublicationYear,
        CatalogField::CoverImage,
        CatalogField::Abstract,
        CatalogField::Matters,
        CatalogField::SubMatters,
        CatalogField::Availability,
        CatalogField::Address,
        CatalogField::Summary,
        CatalogField::Tags,
        CatalogField::NumberOfPages,
        CatalogField::Isbn,
        CatalogField::Issn,
        CatalogField::MaterialType,
        CatalogField::Language,
        CatalogField::Publisher,
        CatalogField::Volume,
        CatalogField::Series,
        CatalogField::Edition,
        CatalogField::ReprintUpdate,
    ];

    /// Wire name accepted in query trees.
    pub fn name(&self) -> &'static str {
        match self {
            CatalogField::Title => "title",
            CatalogField::Authors => "authors",
            CatalogField::PublicationYear => "publication_year",
            CatalogField::CoverImage => "cover_image",
            CatalogField::Abstract => "abstract",
            CatalogField::Matters => "matters",
            CatalogField::SubMatters => "sub_matters",
            CatalogField::Availability => "availability",
            CatalogField::Address => "address",
            CatalogField::Summary => "summary",
            CatalogField::Tags => "tags",
            CatalogField::NumberOfPages => "number_of_pages",
            CatalogField::Isbn => "isbn",
            CatalogField::Issn => "issn",
            CatalogField::MaterialType => "material_type",
            CatalogField::Language => "language",
            CatalogField::Publisher => "publisher",
            CatalogField::Volume => "volume",
            CatalogField::Series => "series",
            CatalogField::Edition => "edition",
            CatalogField::ReprintUpdate => "reprint_update",
        }
    }

    pub fn resolve(name: &str) -> Result<Self, QueryError> {
        CatalogField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == name)
            .ok_or_else(|| QueryError::UnknownField(name.to_string()))
    }

    pub fn column(&self) -> info_mat::Column {
        match self {
            CatalogField::Title => info_mat::Column::Title,
            CatalogField::Authors => info_mat::Column::Authors,
            CatalogField::PublicationYear => info_mat::Column::PublicationYear,
            CatalogField::CoverImage => info_mat::Column::CoverImage,
            CatalogField::Abstract => info_mat::Column::AbstractText,
            CatalogField::Matters => info_mat::Column::Matters,
            CatalogField::SubMatters => info_mat::Column::SubMatters,
            CatalogField::Availability => info_mat::Column::Availability,
            CatalogField::Address => info_mat::Column::Address,
            CatalogField::Summary => info_mat::Column::Summary,
            CatalogField::Tags => info_mat::Column::Tags,
            CatalogField::NumberOfPages => info_mat::Column::NumberOfPages,
            CatalogField::Isbn => info_mat::Column::Isbn,
            CatalogField::Issn => info_mat::Column::Issn,
            CatalogField::MaterialType => info_mat::Column::MaterialType,
            CatalogField::Language => info_mat::Column::Language,
            CatalogField::Publisher => info_mat::Column::Publisher,
            CatalogField::Volume => info_mat::Column::Volume,
            CatalogField::Series => info_mat::Column::Series,
            CatalogField::Edition => info_mat::Column::Edition,
            CatalogField::ReprintUpdate => info_mat::Column::ReprintUpdate,
        }
    }

    fn is_integer(&self) -> bool {
        matches!(self, CatalogField::Volume)
    }

    /// Textual form of the column: integers are cast so substring matching
    /// works over their serialization.
    fn textual(&self) -> SimpleExpr {
        let col = Expr::col(self.column());
        if self.is_integer() {
            col.cast_as(Alias::new("text"))
        } else {
            col.into()
        }
    }

    /// Case-insensitive containment predicate: LOWER(column) LIKE '%needle%'
    /// with LIKE metacharacters escaped.
    pub fn contains(&self, needle: &str) -> SimpleExpr {
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        Expr::expr(Func::lower(self.textual())).like(LikeExpr::new(pattern).escape('\\'))
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
