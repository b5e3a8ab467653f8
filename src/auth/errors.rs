use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("Identity token could not be verified")]
    #[diagnostic(
        code(lectern::auth::authentication_failed),
        help("Pass a valid bearer token in the Authorization header")
    )]
    AuthenticationFailed,

    #[error("The account `{email}` does not belong to an accepted organization")]
    #[diagnostic(
        code(lectern::auth::organization_rejected),
        help("Accepted domains are configured under [auth] allowed_domains")
    )]
    OrganizationRejected { email: String },

    #[error("The account `{email}` is disabled")]
    #[diagnostic(code(lectern::auth::account_disabled))]
    AccountDisabled { email: String },

    #[error("Missing required permission: {required}")]
    #[diagnostic(
        code(lectern::auth::permission_denied),
        help("Ask an administrator to grant the permission, or FULL access")
    )]
    PermissionDenied { required: String },

    #[error("Storage error: {0}")]
    #[diagnostic(code(lectern::auth::storage))]
    Storage(#[from] crate::errors::CatalogError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            AuthError::OrganizationRejected { .. }
            | AuthError::AccountDisabled { .. }
            | AuthError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("authorization failed: {self}");
        }
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
