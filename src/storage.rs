use crate::entities;
use crate::errors::CatalogError;
use crate::permissions::PermissionKind;
use crate::query::{self, CatalogField, QueryNode};
use crate::settings::Database as DbCfg;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: i32,
    pub email: String,
    pub disabled: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: i32,
    pub user_id: i32,
    pub kind: PermissionKind,
    pub expires_at: Option<i64>,
    pub revoked: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoMat {
    pub id: i32,
    pub title: String,
    pub authors: Vec<String>,
    pub publication_year: String,
    pub cover_image: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub matters: Vec<String>,
    pub sub_matters: Option<Vec<String>>,
    pub availability: Option<String>,
    pub address: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
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

/// Payload for creating a catalog record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInfoMat {
    pub title: String,
    pub authors: Vec<String>,
    pub publication_year: String,
    pub cover_image: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub matters: Vec<String>,
    #[serde(default)]
    pub sub_matters: Option<Vec<String>>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub number_of_pages: String,
    pub isbn: String,
    pub issn: String,
    pub material_type: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub publisher: String,
    pub volume: i32,
    pub series: String,
    pub edition: String,
    pub reprint_update: String,
}

fn default_language() -> String {
    "PT-BR".to_string()
}

/// Partial update for a catalog record; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfoMatPatch {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub publication_year: Option<String>,
    pub cover_image: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub matters: Option<Vec<String>>,
    pub sub_matters: Option<Vec<String>>,
    pub availability: Option<String>,
    pub address: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub number_of_pages: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub material_type: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub volume: Option<i32>,
    pub series: Option<String>,
    pub edition: Option<String>,
    pub reprint_update: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoMatWithRating {
    #[serde(flatten)]
    pub info_mat: InfoMat,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i32,
    pub info_mat_id: i32,
    pub user_id: i32,
    pub rating: f64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingList {
    pub id: i32,
    pub name: String,
    pub user_id: i32,
    pub public: bool,
    pub created_at: i64,
    pub items: Vec<InfoMat>,
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, CatalogError> {
    let db = Database::connect(&cfg.url).await?;
    Ok(db)
}

fn encode_list(values: &[String]) -> Result<String, CatalogError> {
    Ok(serde_json::to_string(values)?)
}

fn decode_list(raw: &str) -> Result<Vec<String>, CatalogError> {
    Ok(serde_json::from_str(raw)?)
}

impl Principal {
    fn from_model(model: entities::user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            disabled: model.disabled != 0,
            created_at: model.created_at,
        }
    }
}

impl PermissionGrant {
    fn from_model(model: entities::permission_grant::Model) -> Result<Self, CatalogError> {
        let kind = model
            .kind
            .parse::<PermissionKind>()
            .map_err(|e| CatalogError::Other(e.to_string()))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind,
            expires_at: model.expires_at,
            revoked: model.revoked != 0,
            created_at: model.created_at,
        })
    }
}

impl InfoMat {
    fn from_model(model: entities::info_mat::Model) -> Result<Self, CatalogError> {
        Ok(Self {
            id: model.id,
            title: model.title,
            authors: decode_list(&model.authors)?,
            publication_year: model.publication_year,
            cover_image: model.cover_image,
            abstract_text: model.abstract_text,
            matters: decode_list(&model.matters)?,
            sub_matters: model.sub_matters.as_deref().map(decode_list).transpose()?,
            availability: model.availability,
            address: model.address,
            summary: model.summary,
            tags: decode_list(&model.tags)?,
            number_of_pages: model.number_of_pages,
            isbn: model.isbn,
            issn: model.issn,
            material_type: model.material_type,
            language: model.language,
            publisher: model.publisher,
            volume: model.volume,
            series: model.series,
            edition: model.edition,
            reprint_update: model.reprint_update,
            number_of_hits: model.number_of_hits,
        })
    }
}

impl Review {
    fn from_model(model: entities::review::Model) -> Self {
        Self {
            id: model.id,
            info_mat_id: model.info_mat_id,
            user_id: model.user_id,
            rating: model.rating,
            created_at: model.created_at,
        }
    }
}

// Principal management

/// Find or create the principal for a verified email. New principals start
/// enabled and with no permission grants.
pub async fn upsert_principal_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Principal, CatalogError> {
    use entities::user::{Column, Entity};

    if let Some(model) = Entity::find().filter(Column::Email.eq(email)).one(db).await? {
        return Ok(Principal::from_model(model));
    }

    let user = entities::user::ActiveModel {
        email: Set(email.to_string()),
        disabled: Set(0),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    let model = user.insert(db).await?;
    Ok(Principal::from_model(model))
}

pub async fn get_principal_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<Principal>, CatalogError> {
    use entities::user::{Column, Entity};

    let model = Entity::find().filter(Column::Email.eq(email)).one(db).await?;
    Ok(model.map(Principal::from_model))
}

pub async fn set_principal_disabled(
    db: &DatabaseConnection,
    email: &str,
    disabled: bool,
) -> Result<Option<Principal>, CatalogError> {
    use entities::user::{Column, Entity};

    if let Some(model) = Entity::find().filter(Column::Email.eq(email)).one(db).await? {
        let mut active: entities::user::ActiveModel = model.into();
        active.disabled = Set(if disabled { 1 } else { 0 });
        let updated = active.update(db).await?;
        Ok(Some(Principal::from_model(updated)))
    } else {
        Ok(None)
    }
}

pub async fn delete_principal(db: &DatabaseConnection, email: &str) -> Result<bool, CatalogError> {
    use entities::user::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::Email.eq(email))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

// Permission grants

/// Attach a permission kind to a principal. `expires_at` of `None` means
/// the grant never expires.
pub async fn register_permission(
    db: &DatabaseConnection,
    user_id: i32,
    kind: PermissionKind,
    expires_at: Option<i64>,
) -> Result<PermissionGrant, CatalogError> {
    let grant = entities::permission_grant::ActiveModel {
        user_id: Set(user_id),
        kind: Set(kind.as_str().to_string()),
        expires_at: Set(expires_at),
        revoked: Set(0),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    let model = grant.insert(db).await?;
    PermissionGrant::from_model(model)
}

/// Mark a grant revoked. The row is kept for audit history.
pub async fn revoke_permission(
    db: &DatabaseConnection,
    grant_id: i32,
) -> Result<bool, CatalogError> {
    use entities::permission_grant::{Column, Entity};

    if let Some(model) = Entity::find().filter(Column::Id.eq(grant_id)).one(db).await? {
        let mut active: entities::permission_grant::ActiveModel = model.into();
        active.revoked = Set(1);
        active.update(db).await?;
        Ok(true)
    } else {
        Ok(false)
    }
}

pub async fn grants_for_principal(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<PermissionGrant>, CatalogError> {
    use entities::permission_grant::{Column, Entity};

    let models = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    models.into_iter().map(PermissionGrant::from_model).collect()
}

/// Effective permission set: kinds across grants that are not revoked and
/// not expired. Grant rows with an unrecognized kind are skipped.
pub async fn active_permission_kinds(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<HashSet<PermissionKind>, CatalogError> {
    use entities::permission_grant::{Column, Entity};

    let now = Utc::now().timestamp();
    let models = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Revoked.eq(0))
        .filter(
            Condition::any()
                .add(Column::ExpiresAt.is_null())
                .add(Column::ExpiresAt.gt(now)),
        )
        .all(db)
        .await?;

    let mut kinds = HashSet::new();
    for model in models {
        match model.kind.parse::<PermissionKind>() {
            Ok(kind) => {
                kinds.insert(kind);
            }
            Err(e) => {
                tracing::warn!("skipping grant {}: {e}", model.id);
            }
        }
    }
    Ok(kinds)
}

// Catalog records

pub async fn create_info_mat(
    db: &DatabaseConnection,
    input: NewInfoMat,
) -> Result<InfoMat, CatalogError> {
    let info_mat = entities::info_mat::ActiveModel {
        title: Set(input.title),
        authors: Set(encode_list(&input.authors)?),
        publication_year: Set(input.publication_year),
        cover_image: Set(input.cover_image),
        abstract_text: Set(input.abstract_text),
        matters: Set(encode_list(&input.matters)?),
        sub_matters: Set(input
            .sub_matters
            .as_deref()
            .map(encode_list)
            .transpose()?),
        availability: Set(input.availability),
        address: Set(input.address),
        summary: Set(input.summary),
        tags: Set(encode_list(&input.tags)?),
        number_of_pages: Set(input.number_of_pages),
        isbn: Set(input.isbn),
        issn: Set(input.issn),
        material_type: Set(input.material_type),
        language: Set(input.language),
        publisher: Set(input.publisher),
        volume: Set(input.volume),
        series: Set(input.series),
        edition: Set(input.edition),
        reprint_update: Set(input.reprint_update),
        number_of_hits: Set(0),
        ..Default::default()
    };
    let model = info_mat.insert(db).await?;
    InfoMat::from_model(model)
}

pub async fn get_info_mat(
    db: &DatabaseConnection,
    info_mat_id: i32,
) -> Result<Option<InfoMat>, CatalogError> {
    use entities::info_mat::{Column, Entity};

    let model = Entity::find()
        .filter(Column::Id.eq(info_mat_id))
        .one(db)
        .await?;
    model.map(InfoMat::from_model).transpose()
}

/// Catalog record plus its average review rating (0.0 when unreviewed).
pub async fn get_info_mat_with_rating(
    db: &DatabaseConnection,
    info_mat_id: i32,
) -> Result<Option<InfoMatWithRating>, CatalogError> {
    let Some(info_mat) = get_info_mat(db, info_mat_id).await? else {
        return Ok(None);
    };
    let rating = average_rating(db, info_mat_id).await?.unwrap_or(0.0);
    Ok(Some(InfoMatWithRating { info_mat, rating }))
}

pub async fn all_info_mats(db: &DatabaseConnection) -> Result<Vec<InfoMat>, CatalogError> {
    use entities::info_mat::{Column, Entity};

    let models = Entity::find().order_by_asc(Column::Id).all(db).await?;
    models.into_iter().map(InfoMat::from_model).collect()
}

pub async fn update_info_mat(
    db: &DatabaseConnection,
    info_mat_id: i32,
    patch: InfoMatPatch,
) -> Result<Option<InfoMat>, CatalogError> {
    use entities::info_mat::{Column, Entity};

    let Some(model) = Entity::find()
        .filter(Column::Id.eq(info_mat_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let mut active: entities::info_mat::ActiveModel = model.into();
    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(authors) = patch.authors {
        active.authors = Set(encode_list(&authors)?);
    }
    if let Some(publication_year) = patch.publication_year {
        active.publication_year = Set(publication_year);
    }
    if let Some(cover_image) = patch.cover_image {
        active.cover_image = Set(cover_image);
    }
    if let Some(abstract_text) = patch.abstract_text {
        active.abstract_text = Set(abstract_text);
    }
    if let Some(matters) = patch.matters {
        active.matters = Set(encode_list(&matters)?);
    }
    if let Some(sub_matters) = patch.sub_matters {
        active.sub_matters = Set(Some(encode_list(&sub_matters)?));
    }
    if let Some(availability) = patch.availability {
        active.availability = Set(Some(availability));
    }
    if let Some(address) = patch.address {
        active.address = Set(Some(address));
    }
    if let Some(summary) = patch.summary {
        active.summary = Set(Some(summary));
    }
    if let Some(tags) = patch.tags {
        active.tags = Set(encode_list(&tags)?);
    }
    if let Some(number_of_pages) = patch.number_of_pages {
        active.number_of_pages = Set(number_of_pages);
    }
    if let Some(isbn) = patch.isbn {
        active.isbn = Set(isbn);
    }
    if let Some(issn) = patch.issn {
        active.issn = Set(issn);
    }
    if let Some(material_type) = patch.material_type {
        active.material_type = Set(material_type);
    }
    if let Some(language) = patch.language {
        active.language = Set(language);
    }
    if let Some(publisher) = patch.publisher {
        active.publisher = Set(publisher);
    }
    if let Some(volume) = patch.volume {
        active.volume = Set(volume);
    }
    if let Some(series) = patch.series {
        active.series = Set(series);
    }
    if let Some(edition) = patch.edition {
        active.edition = Set(edition);
    }
    if let Some(reprint_update) = patch.reprint_update {
        active.reprint_update = Set(reprint_update);
    }

    let updated = active.update(db).await?;
    Ok(Some(InfoMat::from_model(updated)?))
}

pub async fn delete_info_mat(
    db: &DatabaseConnection,
    info_mat_id: i32,
) -> Result<bool, CatalogError> {
    use entities::info_mat::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::Id.eq(info_mat_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn record_hit(db: &DatabaseConnection, info_mat_id: i32) -> Result<(), CatalogError> {
    use entities::info_mat::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::Id.eq(info_mat_id))
        .one(db)
        .await?
    {
        let hits = model.number_of_hits;
        let mut active: entities::info_mat::ActiveModel = model.into();
        active.number_of_hits = Set(hits + 1);
        active.update(db).await?;
    }
    Ok(())
}

pub async fn most_accessed(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<InfoMat>, CatalogError> {
    use entities::info_mat::{Column, Entity};

    let models = Entity::find()
        .order_by_desc(Column::NumberOfHits)
        .limit(limit)
        .all(db)
        .await?;
    models.into_iter().map(InfoMat::from_model).collect()
}

// Reviews

/// Insert or update the rating one user gives one material.
pub async fn set_review(
    db: &DatabaseConnection,
    info_mat_id: i32,
    user_id: i32,
    rating: f64,
) -> Result<Review, CatalogError> {
    use entities::review::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::InfoMatId.eq(info_mat_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        let mut active: entities::review::ActiveModel = model.into();
        active.rating = Set(rating);
        let updated = active.update(db).await?;
        return Ok(Review::from_model(updated));
    }

    let review = entities::review::ActiveModel {
        info_mat_id: Set(info_mat_id),
        user_id: Set(user_id),
        rating: Set(rating),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    let model = review.insert(db).await?;
    Ok(Review::from_model(model))
}

pub async fn get_review(
    db: &DatabaseConnection,
    info_mat_id: i32,
    user_id: i32,
) -> Result<Option<Review>, CatalogError> {
    use entities::review::{Column, Entity};

    let model = Entity::find()
        .filter(Column::InfoMatId.eq(info_mat_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(model.map(Review::from_model))
}

pub async fn average_rating(
    db: &DatabaseConnection,
    info_mat_id: i32,
) -> Result<Option<f64>, CatalogError> {
    use entities::review::{Column, Entity};

    let models = Entity::find()
        .filter(Column::InfoMatId.eq(info_mat_id))
        .all(db)
        .await?;
    if models.is_empty() {
        return Ok(None);
    }
    let sum: f64 = models.iter().map(|m| m.rating).sum();
    Ok(Some(sum / models.len() as f64))
}

pub async fn delete_review(
    db: &DatabaseConnection,
    info_mat_id: i32,
    user_id: i32,
) -> Result<bool, CatalogError> {
    use entities::review::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::InfoMatId.eq(info_mat_id))
        .filter(Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

// Reading lists

async fn list_items(
    db: &DatabaseConnection,
    list_id: i32,
) -> Result<Vec<InfoMat>, CatalogError> {
    use entities::info_mat_list_item::{Column, Entity};

    let item_rows = Entity::find()
        .filter(Column::ListId.eq(list_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    let ids: Vec<i32> = item_rows.iter().map(|row| row.info_mat_id).collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    use entities::info_mat::{Column as InfoMatColumn, Entity as InfoMatEntity};
    let models = InfoMatEntity::find()
        .filter(InfoMatColumn::Id.is_in(ids))
        .order_by_asc(InfoMatColumn::Id)
        .all(db)
        .await?;
    models.into_iter().map(InfoMat::from_model).collect()
}

async fn load_reading_list(
    db: &DatabaseConnection,
    model: entities::info_mat_list::Model,
) -> Result<ReadingList, CatalogError> {
    let items = list_items(db, model.id).await?;
    Ok(ReadingList {
        id: model.id,
        name: model.name,
        user_id: model.user_id,
        public: model.public != 0,
        created_at: model.created_at,
        items,
    })
}

/// Create a list and attach the given materials. Ids that do not resolve to
/// a catalog record are skipped.
pub async fn create_reading_list(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
    public: bool,
    item_ids: &[i32],
) -> Result<ReadingList, CatalogError> {
    let list = entities::info_mat_list::ActiveModel {
        name: Set(name.to_string()),
        user_id: Set(user_id),
        public: Set(if public { 1 } else { 0 }),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    let model = list.insert(db).await?;

    for info_mat_id in item_ids {
        add_list_item(db, model.id, *info_mat_id).await?;
    }
    load_reading_list(db, model).await
}

pub async fn get_reading_list(
    db: &DatabaseConnection,
    list_id: i32,
) -> Result<Option<ReadingList>, CatalogError> {
    use entities::info_mat_list::{Column, Entity};

    if let Some(model) = Entity::find().filter(Column::Id.eq(list_id)).one(db).await? {
        Ok(Some(load_reading_list(db, model).await?))
    } else {
        Ok(None)
    }
}

/// A list is browsable anonymously only when flagged public.
pub async fn get_public_reading_list(
    db: &DatabaseConnection,
    list_id: i32,
) -> Result<Option<ReadingList>, CatalogError> {
    use entities::info_mat_list::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::Id.eq(list_id))
        .filter(Column::Public.ne(0))
        .one(db)
        .await?
    {
        Ok(Some(load_reading_list(db, model).await?))
    } else {
        Ok(None)
    }
}

pub async fn reading_lists_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<ReadingList>, CatalogError> {
    use entities::info_mat_list::{Column, Entity};

    let models = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;

    let mut lists = Vec::with_capacity(models.len());
    for model in models {
        lists.push(load_reading_list(db, model).await?);
    }
    Ok(lists)
}

pub async fn is_list_owner(
    db: &DatabaseConnection,
    user_id: i32,
    list_id: i32,
) -> Result<bool, CatalogError> {
    use entities::info_mat_list::{Column, Entity};

    let found = Entity::find()
        .filter(Column::Id.eq(list_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(found.is_some())
}

/// Attach a material to a list. Returns false when the material does not
/// exist or is already on the list.
pub async fn add_list_item(
    db: &DatabaseConnection,
    list_id: i32,
    info_mat_id: i32,
) -> Result<bool, CatalogError> {
    use entities::info_mat_list_item::{Column, Entity};

    if get_info_mat(db, info_mat_id).await?.is_none() {
        return Ok(false);
    }

    let existing = Entity::find()
        .filter(Column::ListId.eq(list_id))
        .filter(Column::InfoMatId.eq(info_mat_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let item = entities::info_mat_list_item::ActiveModel {
        list_id: Set(list_id),
        info_mat_id: Set(info_mat_id),
        ..Default::default()
    };
    item.insert(db).await?;
    Ok(true)
}

pub async fn remove_list_item(
    db: &DatabaseConnection,
    list_id: i32,
    info_mat_id: i32,
) -> Result<(), CatalogError> {
    use entities::info_mat_list_item::{Column, Entity};

    Entity::delete_many()
        .filter(Column::ListId.eq(list_id))
        .filter(Column::InfoMatId.eq(info_mat_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Delete a list owned by `user_id`, cascading its items. Returns false
/// when the list does not exist or belongs to someone else.
pub async fn delete_reading_list(
    db: &DatabaseConnection,
    user_id: i32,
    list_id: i32,
) -> Result<bool, CatalogError> {
    use entities::info_mat_list::{Column, Entity};
    use entities::info_mat_list_item::{Column as ItemColumn, Entity as ItemEntity};

    let Some(model) = Entity::find()
        .filter(Column::Id.eq(list_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(false);
    };

    ItemEntity::delete_many()
        .filter(ItemColumn::ListId.eq(list_id))
        .exec(db)
        .await?;
    let active: entities::info_mat_list::ActiveModel = model.into();
    active.delete(db).await?;
    Ok(true)
}

// Search

/// Match one needle against any queryable field, case-insensitively.
pub async fn search_substring(
    db: &DatabaseConnection,
    needle: &str,
) -> Result<Vec<InfoMat>, CatalogError> {
    use entities::info_mat::{Column, Entity};

    let condition = CatalogField::ALL
        .iter()
        .fold(Condition::any(), |cond, field| {
            cond.add(field.contains(needle))
        });

    let models = Entity::find()
        .filter(condition)
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    models.into_iter().map(InfoMat::from_model).collect()
}

/// Run a compiled boolean query tree. Results follow primary-key order;
/// the compiler imposes no reordering.
pub async fn boolean_search(
    db: &DatabaseConnection,
    tree: &QueryNode,
) -> Result<Vec<InfoMat>, CatalogError> {
    use entities::info_mat::{Column, Entity};

    let models = Entity::find()
        .filter(query::compile(tree))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    models.into_iter().map(InfoMat::from_model).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;
    use tempfile::NamedTempFile;

    /// Test database helper that keeps temp file alive
    struct TestDb {
        connection: DatabaseConnection,
        _temp_file: NamedTempFile,
    }

    impl TestDb {
        async fn new() -> Self {
            let temp_file = NamedTempFile::new().expect("Failed to create temp file");
            let db_path = temp_file.path().to_str().expect("Invalid temp file path");
            let db_url = format!("sqlite://{}?mode=rwc", db_path);

            let connection = Database::connect(&db_url)
                .await
                .expect("Failed to connect to test database");

            migration::Migrator::up(&connection, None)
                .await
                .expect("Failed to run migrations");

            Self {
                connection,
                _temp_file: temp_file,
            }
        }

        fn connection(&self) -> &DatabaseConnection {
            &self.connection
        }
    }

    fn sample_info_mat(title: &str) -> NewInfoMat {
        NewInfoMat {
            title: title.to_string(),
            authors: vec!["John Doe".to_string()],
            publication_year: "2023".to_string(),
            cover_image: "cover_image_url".to_string(),
            abstract_text: "This is a sample book abstract.".to_string(),
            matters: vec!["Science".to_string()],
            sub_matters: None,
            availability: None,
            address: None,
            summary: None,
            tags: vec!["Sample".to_string()],
            number_of_pages: "200".to_string(),
            isbn: "1234567890".to_string(),
            issn: "9876543210".to_string(),
            material_type: "Book".to_string(),
            language: "PT-BR".to_string(),
            publisher: "Example Publishing".to_string(),
            volume: 1,
            series: "Sample Series".to_string(),
            edition: "1st Edition".to_string(),
            reprint_update: "2023-09-20".to_string(),
        }
    }

    // ============================================================================
    // Principal Tests
    // ============================================================================

    #[tokio::test]
    async fn test_upsert_principal_creates_once() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let first = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let second = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");

        assert_eq!(first.id, second.id);
        assert_eq!(first.email, "alice@example.edu");
        assert!(!first.disabled);
    }

    #[tokio::test]
    async fn test_get_principal_not_found() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let result = get_principal_by_email(db, "nobody@example.edu")
            .await
            .expect("Query failed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_set_principal_disabled() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");

        let updated = set_principal_disabled(db, "alice@example.edu", true)
            .await
            .expect("Failed to update principal")
            .expect("Principal not found");
        assert!(updated.disabled);

        let reenabled = set_principal_disabled(db, "alice@example.edu", false)
            .await
            .expect("Failed to update principal")
            .expect("Principal not found");
        assert!(!reenabled.disabled);
    }

    #[tokio::test]
    async fn test_delete_principal() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");

        assert!(delete_principal(db, "alice@example.edu")
            .await
            .expect("Delete failed"));
        assert!(!delete_principal(db, "alice@example.edu")
            .await
            .expect("Delete failed"));
    }

    // ============================================================================
    // Permission Grant Tests
    // ============================================================================

    #[tokio::test]
    async fn test_register_permission_active() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        register_permission(db, alice.id, PermissionKind::EditItem, None)
            .await
            .expect("Failed to register permission");

        let kinds = active_permission_kinds(db, alice.id)
            .await
            .expect("Failed to resolve permissions");
        assert!(kinds.contains(&PermissionKind::EditItem));
        assert_eq!(kinds.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_grant_excluded() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let past = Utc::now().timestamp() - 1;
        register_permission(db, alice.id, PermissionKind::EditItem, Some(past))
            .await
            .expect("Failed to register permission");

        let kinds = active_permission_kinds(db, alice.id)
            .await
            .expect("Failed to resolve permissions");
        assert!(kinds.is_empty());
    }

    #[tokio::test]
    async fn test_null_expiry_never_expires() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        register_permission(db, alice.id, PermissionKind::Full, None)
            .await
            .expect("Failed to register permission");

        let kinds = active_permission_kinds(db, alice.id)
            .await
            .expect("Failed to resolve permissions");
        assert!(kinds.contains(&PermissionKind::Full));
    }

    #[tokio::test]
    async fn test_revoke_marks_grant_inactive() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let grant = register_permission(db, alice.id, PermissionKind::EditItem, None)
            .await
            .expect("Failed to register permission");

        assert!(revoke_permission(db, grant.id).await.expect("Revoke failed"));

        // The revoked flag must read back as set; a revoke that left the
        // flag clear would keep the grant in the effective set.
        let grants = grants_for_principal(db, alice.id)
            .await
            .expect("Failed to list grants");
        assert_eq!(grants.len(), 1);
        assert!(grants[0].revoked);

        let kinds = active_permission_kinds(db, alice.id)
            .await
            .expect("Failed to resolve permissions");
        assert!(kinds.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_keeps_audit_row() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let grant = register_permission(db, alice.id, PermissionKind::ViewItem, None)
            .await
            .expect("Failed to register permission");
        revoke_permission(db, grant.id).await.expect("Revoke failed");

        // Revocation never deletes the row
        let grants = grants_for_principal(db, alice.id)
            .await
            .expect("Failed to list grants");
        assert_eq!(grants.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_missing_grant() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        assert!(!revoke_permission(db, 4242).await.expect("Revoke failed"));
    }

    // ============================================================================
    // Catalog Record Tests
    // ============================================================================

    #[tokio::test]
    async fn test_create_and_get_info_mat() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let created = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");

        let fetched = get_info_mat(db, created.id)
            .await
            .expect("Failed to get info mat")
            .expect("Info mat not found");

        assert_eq!(fetched.title, "Sample Book");
        assert_eq!(fetched.authors, vec!["John Doe"]);
        assert_eq!(fetched.number_of_hits, 0);
    }

    #[tokio::test]
    async fn test_update_info_mat_partial() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let created = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");

        let patch = InfoMatPatch {
            title: Some("Updated Sample Book Title".to_string()),
            tags: Some(vec!["Updated".to_string()]),
            ..Default::default()
        };
        let updated = update_info_mat(db, created.id, patch)
            .await
            .expect("Failed to update info mat")
            .expect("Info mat not found");

        assert_eq!(updated.title, "Updated Sample Book Title");
        assert_eq!(updated.tags, vec!["Updated"]);
        // Untouched fields survive
        assert_eq!(updated.publisher, "Example Publishing");
    }

    #[tokio::test]
    async fn test_update_missing_info_mat() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let result = update_info_mat(db, 999, InfoMatPatch::default())
            .await
            .expect("Query failed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_info_mat() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let created = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");

        assert!(delete_info_mat(db, created.id).await.expect("Delete failed"));
        assert!(get_info_mat(db, created.id)
            .await
            .expect("Query failed")
            .is_none());
    }

    #[tokio::test]
    async fn test_all_info_mats_ordered_by_id() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let first = create_info_mat(db, sample_info_mat("First"))
            .await
            .expect("Failed to create info mat");
        let second = create_info_mat(db, sample_info_mat("Second"))
            .await
            .expect("Failed to create info mat");

        let all = all_info_mats(db).await.expect("Failed to list info mats");
        assert_eq!(
            all.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[tokio::test]
    async fn test_record_hit_and_most_accessed() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let quiet = create_info_mat(db, sample_info_mat("Quiet"))
            .await
            .expect("Failed to create info mat");
        let popular = create_info_mat(db, sample_info_mat("Popular"))
            .await
            .expect("Failed to create info mat");

        record_hit(db, popular.id).await.expect("Failed to record hit");
        record_hit(db, popular.id).await.expect("Failed to record hit");

        let ranked = most_accessed(db, 10).await.expect("Failed to rank");
        assert_eq!(ranked[0].id, popular.id);
        assert_eq!(ranked[0].number_of_hits, 2);
        assert_eq!(ranked[1].id, quiet.id);
    }

    // ============================================================================
    // Review Tests
    // ============================================================================

    #[tokio::test]
    async fn test_set_review_upserts() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let book = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");

        let first = set_review(db, book.id, alice.id, 3.8)
            .await
            .expect("Failed to set review");
        let second = set_review(db, book.id, alice.id, 4.5)
            .await
            .expect("Failed to update review");

        // Same row, new rating
        assert_eq!(first.id, second.id);
        assert_eq!(second.rating, 4.5);

        let fetched = get_review(db, book.id, alice.id)
            .await
            .expect("Failed to get review")
            .expect("Review not found");
        assert_eq!(fetched.rating, 4.5);
    }

    #[tokio::test]
    async fn test_average_rating() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let bob = upsert_principal_by_email(db, "bob@example.edu")
            .await
            .expect("Failed to upsert principal");
        let book = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");

        assert!(average_rating(db, book.id)
            .await
            .expect("Query failed")
            .is_none());

        set_review(db, book.id, alice.id, 3.0)
            .await
            .expect("Failed to set review");
        set_review(db, book.id, bob.id, 5.0)
            .await
            .expect("Failed to set review");

        let avg = average_rating(db, book.id)
            .await
            .expect("Query failed")
            .expect("Average missing");
        assert!((avg - 4.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_delete_review() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let book = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");
        set_review(db, book.id, alice.id, 3.8)
            .await
            .expect("Failed to set review");

        assert!(delete_review(db, book.id, alice.id)
            .await
            .expect("Delete failed"));
        assert!(!delete_review(db, book.id, alice.id)
            .await
            .expect("Delete failed"));
    }

    #[tokio::test]
    async fn test_info_mat_with_rating() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let book = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");

        let unrated = get_info_mat_with_rating(db, book.id)
            .await
            .expect("Query failed")
            .expect("Info mat not found");
        assert_eq!(unrated.rating, 0.0);

        set_review(db, book.id, alice.id, 4.0)
            .await
            .expect("Failed to set review");
        let rated = get_info_mat_with_rating(db, book.id)
            .await
            .expect("Query failed")
            .expect("Info mat not found");
        assert_eq!(rated.rating, 4.0);
    }

    // ============================================================================
    // Reading List Tests
    // ============================================================================

    #[tokio::test]
    async fn test_create_reading_list_with_items() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let book = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");

        // Unknown item ids are skipped, not errors
        let list = create_reading_list(db, alice.id, "My List", false, &[book.id, 999])
            .await
            .expect("Failed to create list");

        assert_eq!(list.name, "My List");
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].id, book.id);
    }

    #[tokio::test]
    async fn test_public_list_visibility() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let private = create_reading_list(db, alice.id, "Private", false, &[])
            .await
            .expect("Failed to create list");
        let public = create_reading_list(db, alice.id, "Public", true, &[])
            .await
            .expect("Failed to create list");

        assert!(get_public_reading_list(db, private.id)
            .await
            .expect("Query failed")
            .is_none());
        assert!(get_public_reading_list(db, public.id)
            .await
            .expect("Query failed")
            .is_some());
    }

    #[tokio::test]
    async fn test_duplicate_list_item_rejected() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let book = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");
        let list = create_reading_list(db, alice.id, "My List", false, &[])
            .await
            .expect("Failed to create list");

        assert!(add_list_item(db, list.id, book.id).await.expect("Add failed"));
        assert!(!add_list_item(db, list.id, book.id).await.expect("Add failed"));
    }

    #[tokio::test]
    async fn test_remove_list_item() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let book = create_info_mat(db, sample_info_mat("Sample Book"))
            .await
            .expect("Failed to create info mat");
        let list = create_reading_list(db, alice.id, "My List", false, &[book.id])
            .await
            .expect("Failed to create list");

        remove_list_item(db, list.id, book.id)
            .await
            .expect("Remove failed");

        let fetched = get_reading_list(db, list.id)
            .await
            .expect("Query failed")
            .expect("List not found");
        assert!(fetched.items.is_empty());
    }

    #[tokio::test]
    async fn test_delete_reading_list_enforces_owner() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let bob = upsert_principal_by_email(db, "bob@example.edu")
            .await
            .expect("Failed to upsert principal");
        let list = create_reading_list(db, alice.id, "My List", false, &[])
            .await
            .expect("Failed to create list");

        assert!(!delete_reading_list(db, bob.id, list.id)
            .await
            .expect("Delete failed"));
        assert!(delete_reading_list(db, alice.id, list.id)
            .await
            .expect("Delete failed"));
        assert!(get_reading_list(db, list.id)
            .await
            .expect("Query failed")
            .is_none());
    }

    #[tokio::test]
    async fn test_reading_lists_for_user() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let alice = upsert_principal_by_email(db, "alice@example.edu")
            .await
            .expect("Failed to upsert principal");
        let bob = upsert_principal_by_email(db, "bob@example.edu")
            .await
            .expect("Failed to upsert principal");
        create_reading_list(db, alice.id, "Alice A", false, &[])
            .await
            .expect("Failed to create list");
        create_reading_list(db, alice.id, "Alice B", true, &[])
            .await
            .expect("Failed to create list");
        create_reading_list(db, bob.id, "Bob", false, &[])
            .await
            .expect("Failed to create list");

        let lists = reading_lists_for_user(db, alice.id)
            .await
            .expect("Query failed");
        assert_eq!(lists.len(), 2);
        assert!(lists.iter().all(|l| l.user_id == alice.id));
    }

    // ============================================================================
    // Search Tests
    // ============================================================================

    #[tokio::test]
    async fn test_search_substring_case_insensitive() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let book = create_info_mat(db, sample_info_mat("Politics Today"))
            .await
            .expect("Failed to create info mat");

        let found = search_substring(db, "politics").await.expect("Search failed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, book.id);

        let found = search_substring(db, "POLITICS").await.expect("Search failed");
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_search_substring_matches_list_fields() {
        let test_db = TestDb::new().await;
        let db = test_db.connection();

        let mut input = sample_info_mat("Physics");
        input.matters = vec!["quantum mechanics".to_string()];
        let book = create_info_mat(db, input).await.expect("Failed to create");

        let found = search_substring(db, "quantum").await.expect("Search failed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, book.id);

        let found = search_substring(db, "astrology").await.expect("Search failed");
        assert!(found.is_empty());
    }
}
