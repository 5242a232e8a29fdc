use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::{
    authentication::{AuthUser, MaybeUser},
    data_formats::{
        AuthorQueryParams, CommentRequest, CommentResponse, CommentWrapper,
        MultipleCommentsWrapper,
    },
    db_helpers::{
        add_comment_to_article_in_db, delete_comment_in_db, get_comments_for_article_in_db,
    },
    errors::RequestError,
    AppState, JsonResponse,
};

use super::JsonResult;

// ----------------- Comment Handlers -----------------
pub async fn list_comments(
    Extension(state): Extension<Arc<AppState>>,
    maybe_user: MaybeUser,
    Path(slug): Path<String>,
    Query(AuthorQueryParams { author }): Query<AuthorQueryParams>,
) -> JsonResult<MultipleCommentsWrapper> {
    let viewer = maybe_user.username();
    let comments =
        get_comments_for_article_in_db(&state.pool, &slug, viewer, author.as_deref()).await?;
    Ok(Json(MultipleCommentsWrapper {
        comments: comments
            .into_iter()
            .map(|comment| CommentResponse::new(comment, viewer))
            .collect(),
    }))
}

pub async fn add_comment(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(CommentWrapper { comment }): Json<CommentWrapper<CommentRequest>>,
) -> Result<JsonResponse<CommentWrapper<CommentResponse>>, RequestError> {
    let comment = add_comment_to_article_in_db(&state.pool, &user.username, &slug, comment).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentWrapper {
            comment: CommentResponse::new(comment, Some(&user.username)),
        }),
    ))
}

pub async fn delete_comment(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path((slug, id)): Path<(String, i64)>,
) -> JsonResult<Value> {
    delete_comment_in_db(&state.pool, &user.username, &slug, id).await?;
    Ok(Json(json!({})))
}
