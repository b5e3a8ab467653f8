use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(lectern::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(lectern::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(lectern::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(lectern::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Bad request: {0}")]
    #[diagnostic(code(lectern::bad_request))]
    BadRequest(String),

    #[error("{0}")]
    #[diagnostic(code(lectern::other))]
    Other(String),
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = match &self {
            CatalogError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {self}");
        }
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
