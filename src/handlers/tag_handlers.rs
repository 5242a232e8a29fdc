use std::sync::Arc;

use axum::{extract::Query, Extension, Json};

use crate::{
    data_formats::{AuthorQueryParams, TagsWrapper},
    db_helpers::get_tags_in_db,
    AppState,
};

use super::JsonResult;

pub async fn list_tags(
    Extension(state): Extension<Arc<AppState>>,
    Query(AuthorQueryParams { author }): Query<AuthorQueryParams>,
) -> JsonResult<TagsWrapper> {
    let tags = get_tags_in_db(&state.pool, author.as_deref()).await?;
    Ok(Json(TagsWrapper { tags }))
}
