use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("Invalid query shape: {0}")]
    #[diagnostic(
        code(lectern::query::invalid_shape),
        help("Each node is an object with exactly one key among `and`, `or`, `not`, or a field name; `and`/`or` take a non-empty list and `not` takes a single field predicate")
    )]
    InvalidShape(String),

    #[error("Unknown query field `{0}`")]
    #[diagnostic(
        code(lectern::query::unknown_field),
        help("Field names are the catalog columns, e.g. `title`, `authors`, `matters`, `tags`, `publisher`")
    )]
    UnknownField(String),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}
