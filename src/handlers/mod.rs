use axum::{
    http::{StatusCode, Uri},
    Json,
};
use serde_json::{json, Value};

use crate::errors::RequestError;

mod article_handlers;
mod comment_handlers;
mod tag_handlers;
mod user_handlers;

pub use article_handlers::*;
pub use comment_handlers::*;
pub use tag_handlers::*;
pub use user_handlers::*;

type JsonResult<T> = Result<Json<T>, RequestError>;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn api_status() -> Json<Value> {
    Json(json!({ "status": "API is running on /api" }))
}

pub async fn not_found(uri: Uri) -> Result<(), (StatusCode, String)> {
    Err((
        StatusCode::NOT_FOUND,
        format!("URL {} provided was not found", uri),
    ))
}
