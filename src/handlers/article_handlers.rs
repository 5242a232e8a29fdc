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
        ArticleQueryParams, ArticleResponse, ArticleWrapper, CreateArticleRequest,
        FeedQueryParams, MultipleArticlesWrapper, UpdateArticleRequest,
    },
    db_helpers::{
        create_article_in_db, delete_article_in_db, favorite_article_in_db,
        get_article_by_slug_in_db, get_feed_in_db, list_articles_in_db,
        unfavorite_article_in_db, update_article_in_db,
    },
    errors::RequestError,
    models::Article,
    AppState, JsonResponse,
};

use super::JsonResult;

type ArticleJson = ArticleWrapper<ArticleResponse>;

fn wrap(article: Article, viewer: Option<&str>) -> ArticleJson {
    ArticleWrapper {
        article: ArticleResponse::new(article, viewer),
    }
}

fn wrap_many(articles: Vec<Article>, articles_count: i64, viewer: Option<&str>) -> MultipleArticlesWrapper {
    MultipleArticlesWrapper {
        articles: articles
            .into_iter()
            .map(|article| ArticleResponse::new(article, viewer))
            .collect(),
        articles_count,
    }
}

// ----------------- Article Handlers -----------------
pub async fn list_articles(
    Extension(state): Extension<Arc<AppState>>,
    maybe_user: MaybeUser,
    Query(params): Query<ArticleQueryParams>,
) -> JsonResult<MultipleArticlesWrapper> {
    let viewer = maybe_user.username();
    let (articles, count) = list_articles_in_db(&state.pool, viewer, &params).await?;
    Ok(Json(wrap_many(articles, count, viewer)))
}

pub async fn feed_articles(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<FeedQueryParams>,
) -> JsonResult<MultipleArticlesWrapper> {
    let (articles, count) = get_feed_in_db(&state.pool, &user.username, params.pagination()).await?;
    Ok(Json(wrap_many(articles, count, Some(&user.username))))
}

pub async fn get_article(
    Extension(state): Extension<Arc<AppState>>,
    maybe_user: MaybeUser,
    Path(slug): Path<String>,
) -> JsonResult<ArticleJson> {
    let viewer = maybe_user.username();
    let article = get_article_by_slug_in_db(&state.pool, &slug, viewer)
        .await?
        .ok_or(RequestError::NotFound("Article not found"))?;
    Ok(Json(wrap(article, viewer)))
}

pub async fn create_article(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Json(ArticleWrapper { article }): Json<ArticleWrapper<CreateArticleRequest>>,
) -> Result<JsonResponse<ArticleJson>, RequestError> {
    let article = create_article_in_db(&state.pool, &user.username, article).await?;
    Ok((StatusCode::CREATED, Json(wrap(article, Some(&user.username)))))
}

pub async fn update_article(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(ArticleWrapper { article }): Json<ArticleWrapper<UpdateArticleRequest>>,
) -> JsonResult<ArticleJson> {
    let article = update_article_in_db(&state.pool, &user.username, &slug, article).await?;
    Ok(Json(wrap(article, Some(&user.username))))
}

pub async fn delete_article(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> JsonResult<Value> {
    delete_article_in_db(&state.pool, &user.username, &slug).await?;
    Ok(Json(json!({})))
}

pub async fn favorite_article(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> JsonResult<ArticleJson> {
    let article = favorite_article_in_db(&state.pool, &user.username, &slug).await?;
    Ok(Json(wrap(article, Some(&user.username))))
}

pub async fn unfavorite_article(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> JsonResult<ArticleJson> {
    let article = unfavorite_article_in_db(&state.pool, &user.username, &slug).await?;
    Ok(Json(wrap(article, Some(&user.username))))
}
