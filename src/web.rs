//! HTTP surface of the catalog service.
//!
//! Read endpoints are open; every mutating endpoint resolves the bearer
//! token through the [`AuthGate`] and checks its declared permission
//! requirement before touching storage.

use crate::auth::errors::AuthError;
use crate::auth::{AuthContext, AuthGate};
use crate::permissions::PermissionKind;
use crate::query;
use crate::settings::Settings;
use crate::storage;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseConnection,
    pub auth: Arc<AuthGate>,
}

pub async fn serve(
    settings: Settings,
    db: DatabaseConnection,
    auth: AuthGate,
) -> miette::Result<()> {
    let addr = settings.bind_addr();
    let state = AppState {
        settings: Arc::new(settings),
        db,
        auth: Arc::new(auth),
    };

    let router = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| miette::miette!("Failed to bind {addr}: {e}"))?;
    tracing::info!("Listening on {addr}");
    axum::serve(listener, router)
        .await
        .map_err(|e| miette::miette!("Server error: {e}"))?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        // Catalog
        .route("/materials/{id}", get(material_basic).delete(delete_material))
        .route("/materials/{id}/details", get(material_details))
        .route("/materials/search", get(search))
        .route("/materials/search/boolean", post(boolean_search))
        .route("/materials/popular", get(popular))
        .route(
            "/materials",
            get(all_materials).post(create_material).put(update_material),
        )
        // Reviews
        .route("/reviews", post(set_review).delete(delete_review))
        // Reading lists
        .route("/lists", get(my_lists).post(create_list))
        .route("/lists/public/{id}", get(public_list))
        .route("/lists/{id}", delete(delete_list))
        .route("/lists/{id}/items", post(add_list_item).delete(remove_list_item))
        // Administration
        .route("/admin/users", patch(set_user_disabled))
        .route(
            "/admin/permissions",
            get(list_grants).post(grant_permission),
        )
        .route("/admin/permissions/{id}", delete(revoke_permission))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Extract the bearer credential from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::AuthenticationFailed)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    state.auth.authenticate(&state.db, token).await
}

// ---------- Catalog reads ----------

async fn material_basic(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match storage::get_info_mat_with_rating(&state.db, id).await {
        Ok(Some(info_mat)) => Json(info_mat).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn material_details(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match storage::get_info_mat(&state.db, id).await {
        Ok(Some(info_mat)) => {
            // Viewing the detail page counts as a hit
            if let Err(e) = storage::record_hit(&state.db, id).await {
                tracing::error!("failed to record hit for {id}: {e}");
            }
            Json(info_mat).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    value: String,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    match storage::search_substring(&state.db, &params.value).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct BooleanSearchBody {
    query: Value,
}

async fn boolean_search(
    State(state): State<AppState>,
    Json(body): Json<BooleanSearchBody>,
) -> Response {
    // Malformed trees come back as a 422 client error, never a blanket fault
    let tree = match query::parse_tree(&body.query) {
        Ok(tree) => tree,
        Err(e) => return e.into_response(),
    };
    match storage::boolean_search(&state.db, &tree).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct PopularParams {
    limit: Option<u64>,
}

async fn popular(State(state): State<AppState>, Query(params): Query<PopularParams>) -> Response {
    match storage::most_accessed(&state.db, params.limit.unwrap_or(10)).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => e.into_response(),
    }
}

// ---------- Catalog management ----------

async fn all_materials(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::ViewItem]) {
        return e.into_response();
    }
    match storage::all_info_mats(&state.db).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn create_material(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<storage::NewInfoMat>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::CreateItem]) {
        return e.into_response();
    }
    match storage::create_info_mat(&state.db, body).await {
        Ok(info_mat) => (StatusCode::CREATED, Json(info_mat)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateMaterialBody {
    id: i32,
    #[serde(flatten)]
    patch: storage::InfoMatPatch,
}

async fn update_material(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateMaterialBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::EditItem]) {
        return e.into_response();
    }
    match storage::update_info_mat(&state.db, body.id, body.patch).await {
        Ok(Some(info_mat)) => Json(info_mat).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_material(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::DeleteItem]) {
        return e.into_response();
    }
    match storage::delete_info_mat(&state.db, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

// ---------- Reviews ----------

#[derive(Debug, Deserialize)]
struct ReviewBody {
    info_mat_id: i32,
    rating: f64,
}

async fn set_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReviewBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    match storage::set_review(&state.db, body.info_mat_id, ctx.principal.id, body.rating).await {
        Ok(review) => Json(review).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct DeleteReviewBody {
    info_mat_id: i32,
}

async fn delete_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DeleteReviewBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    match storage::delete_review(&state.db, body.info_mat_id, ctx.principal.id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

// ---------- Reading lists ----------

#[derive(Debug, Deserialize)]
struct NewListBody {
    name: String,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    items: Vec<i32>,
}

async fn create_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewListBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    match storage::create_reading_list(
        &state.db,
        ctx.principal.id,
        &body.name,
        body.public,
        &body.items,
    )
    .await
    {
        Ok(list) => (StatusCode::CREATED, Json(list)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn my_lists(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    match storage::reading_lists_for_user(&state.db, ctx.principal.id).await {
        Ok(lists) => Json(lists).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn public_list(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match storage::get_public_reading_list(&state.db, id).await {
        Ok(Some(list)) => Json(list).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    match storage::delete_reading_list(&state.db, ctx.principal.id, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ListItemBody {
    info_mat_id: i32,
}

async fn add_list_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(body): Json<ListItemBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    match owned_list_guard(&state, ctx.principal.id, id).await {
        Ok(()) => {}
        Err(response) => return response,
    }
    match storage::add_list_item(&state.db, id, body.info_mat_id).await {
        Ok(true) => StatusCode::CREATED.into_response(),
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "item missing or already on the list" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn remove_list_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(body): Json<ListItemBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    match owned_list_guard(&state, ctx.principal.id, id).await {
        Ok(()) => {}
        Err(response) => return response,
    }
    match storage::remove_list_item(&state.db, id, body.info_mat_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn owned_list_guard(state: &AppState, user_id: i32, list_id: i32) -> Result<(), Response> {
    match storage::is_list_owner(&state.db, user_id, list_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(StatusCode::NOT_FOUND.into_response()),
        Err(e) => Err(e.into_response()),
    }
}

// ---------- Administration ----------

#[derive(Debug, Deserialize)]
struct SetDisabledBody {
    email: String,
    disabled: bool,
}

async fn set_user_disabled(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SetDisabledBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::ManageUsers]) {
        return e.into_response();
    }
    match storage::set_principal_disabled(&state.db, &body.email, body.disabled).await {
        Ok(Some(principal)) => Json(principal).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct GrantBody {
    email: String,
    kind: PermissionKind,
    #[serde(default)]
    expires_at: Option<i64>,
}

async fn grant_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GrantBody>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::ManagePermissions]) {
        return e.into_response();
    }
    let target = match storage::get_principal_by_email(&state.db, &body.email).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return e.into_response(),
    };
    match storage::register_permission(&state.db, target.id, body.kind, body.expires_at).await {
        Ok(grant) => (StatusCode::CREATED, Json(grant)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct GrantListParams {
    email: String,
}

async fn list_grants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<GrantListParams>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::ManagePermissions]) {
        return e.into_response();
    }
    let target = match storage::get_principal_by_email(&state.db, &params.email).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return e.into_response(),
    };
    match storage::grants_for_principal(&state.db, target.id).await {
        Ok(grants) => Json(grants).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn revoke_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    let ctx = match authenticate(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = ctx.require(&[PermissionKind::ManagePermissions]) {
        return e.into_response();
    }
    match storage::revoke_permission(&state.db, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}
