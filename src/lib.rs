mod authentication;
pub mod cleanup;
pub mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
mod models;
mod utils;

use std::{future::Future, net::TcpListener, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
pub use data_formats::*;
pub use db_helpers::seed_demo_data_in_db;
use handlers::*;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;

pub type JsonResponse<T> = (StatusCode, Json<T>);

/// How long a writer waits for the SQLite write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared by every handler through an `Extension`.
pub struct AppState {
    pub pool: SqlitePool,
    pub config: AppConfig,
}

pub async fn run_app(
    app: Router,
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = app.layer(Extension(state));
    tracing::info!(address = %listener.local_addr()?, "server started");
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Creates the database file when it is missing, then opens the pool.
pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !is_in_memory(db_url) && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!(url = db_url, "creating database");
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("could not create database {db_url}"))?;
    }
    init_db_pool(db_url).await
}

pub async fn init_db_pool(db_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("invalid database url {db_url}"))?
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    // An in-memory database lives as long as its single connection.
    let pool_options = if is_in_memory(db_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(16)
    };
    let pool = pool_options.connect_with(options).await?;

    tracing::info!("running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("migrations completed");
    Ok(pool)
}

fn is_in_memory(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

pub fn make_router() -> Router {
    let api = Router::new()
        .route("/users/login", post(login_user))
        .route("/users", post(register_user))
        .route("/user", get(get_current_user).put(update_user))
        .route("/profiles/:username", get(get_profile))
        .route(
            "/profiles/:username/follow",
            post(follow_profile).delete(unfollow_profile),
        )
        .route("/articles", get(list_articles).post(create_article))
        .route("/articles/feed", get(feed_articles))
        .route(
            "/articles/:slug",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route(
            "/articles/:slug/favorite",
            post(favorite_article).delete(unfavorite_article),
        )
        .route(
            "/articles/:slug/comments",
            get(list_comments).post(add_comment),
        )
        .route("/articles/:slug/comments/:id", delete(delete_comment))
        .route("/tags", get(list_tags));

    Router::new()
        .route("/", get(api_status))
        .route("/check_health", get(alive))
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
