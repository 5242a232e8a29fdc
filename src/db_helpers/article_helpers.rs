use std::collections::HashSet;

use sqlx::{SqliteConnection, SqlitePool};

use crate::data_formats::{ArticleQueryParams, CreateArticleRequest, UpdateArticleRequest};
use crate::errors::{RequestError, MUST_BE_UNIQUE};
use crate::models::Article;
use crate::utils::article_slug;

use super::{
    find_user_id_by_username, get_article_id_by_slug, ArticleFilters, AuthorScope, FilterParam,
    Pagination, QueryBuilder,
};

// `$1` is always the viewer's username (NULL for anonymous requests).
const ARTICLE_QUERY: &str = r#"
            SELECT articles.slug                                  AS "slug",
                   articles.title                                 AS "title",
                   articles.description                           AS "description",
                   articles.body                                  AS "body",
                   articles.created_at                            AS "created_at",
                   articles.updated_at                            AS "updated_at",
                   (SELECT Json_group_array(attached.name)
                    FROM   (SELECT tags.name AS name
                            FROM   articletags
                                   JOIN tags
                                     ON tags.id = articletags.tag_id
                            WHERE  articletags.article_id = articles.id
                            ORDER  BY articletags.position) attached) AS "tag_list",
                   users.username                                 AS "author_username",
                   users.image                                    AS "author_image",
                   users.bio                                      AS "author_bio",
                   (SELECT Count(*)
                    FROM   favourite
                    WHERE  favourite.article_id = articles.id)   AS "favorites_count",
                   EXISTS (SELECT 1
                           FROM   favourite
                                  JOIN users viewer
                                    ON viewer.id = favourite.user_id
                           WHERE  favourite.article_id = articles.id
                                  AND viewer.username = $1)      AS "favorited",
                   EXISTS (SELECT 1
                           FROM   follows
                                  JOIN users viewer
                                    ON viewer.id = follows.follower_id
                           WHERE  follows.followed_id = articles.author_id
                                  AND viewer.username = $1)      AS "following"
            FROM   articles
                   JOIN users
                     ON articles.author_id = users.id
"#;

const TOUCH_UPDATED_AT: &str = "updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')";

fn slug_conflict(e: sqlx::Error) -> RequestError {
    let e = RequestError::from(e);
    if e.is_unique_violation("articles.slug") {
        RequestError::unprocessable("title", MUST_BE_UNIQUE)
    } else {
        e
    }
}

async fn fetch_article(
    conn: &mut SqliteConnection,
    slug: &str,
    viewer: Option<&str>,
) -> Result<Option<Article>, sqlx::Error> {
    sqlx::query_as::<_, Article>(&format!("{ARTICLE_QUERY} WHERE articles.slug = $2"))
        .bind(viewer)
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await
}

async fn fetch_article_page(
    conn: &mut SqliteConnection,
    viewer: Option<&str>,
    filters: &ArticleFilters,
    Pagination { offset, limit }: Pagination,
) -> Result<(Vec<Article>, i64), RequestError> {
    let (where_clause, params) = filters.to_sql(1);
    let count_query = format!(
        "SELECT Count(*) FROM articles JOIN users ON articles.author_id = users.id WHERE {where_clause}"
    );
    let mut count = sqlx::query_scalar::<_, i64>(&count_query);
    for param in &params {
        count = match param {
            FilterParam::Text(value) => count.bind(value.as_str()),
            FilterParam::Id(value) => count.bind(*value),
        };
    }
    let articles_count = count.fetch_one(&mut *conn).await?;

    // Shifted by one: the viewer occupies `$1` in the page query.
    let (where_clause, params) = filters.to_sql(2);
    let page_query = format!(
        "{ARTICLE_QUERY} WHERE {where_clause} \
         ORDER BY articles.created_at DESC, articles.id DESC \
         LIMIT ${} OFFSET ${}",
        params.len() + 2,
        params.len() + 3
    );
    let mut page = sqlx::query_as::<_, Article>(&page_query).bind(viewer);
    for param in &params {
        page = match param {
            FilterParam::Text(value) => page.bind(value.as_str()),
            FilterParam::Id(value) => page.bind(*value),
        };
    }
    let articles = page
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

    Ok((articles, articles_count))
}

/// Fails with the title-uniqueness error when `slug` belongs to an article other than `except`.
async fn ensure_slug_available(
    conn: &mut SqliteConnection,
    slug: &str,
    except: Option<i64>,
) -> Result<(), RequestError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM articles WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    match existing {
        Some(id) if Some(id) != except => Err(RequestError::unprocessable("title", MUST_BE_UNIQUE)),
        _ => Ok(()),
    }
}

/// Trimmed, non-empty, first occurrence wins.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

/// Upserts every tag by name and links it to the article, keeping the request order.
async fn connect_tags(
    conn: &mut SqliteConnection,
    article_id: i64,
    tags: Vec<String>,
) -> Result<(), RequestError> {
    for (position, name) in (0_i64..).zip(normalize_tags(tags)) {
        let tag_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(&name)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO articletags (article_id, tag_id, position) VALUES ($1, $2, $3)",
        )
        .bind(article_id)
        .bind(tag_id)
        .bind(position)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Returns the id of the article behind `slug` after checking `username` wrote it.
async fn owned_article_id(
    conn: &mut SqliteConnection,
    username: &str,
    slug: &str,
) -> Result<(i64, i64), RequestError> {
    let author_id = find_user_id_by_username(conn, username).await?;
    let article: Option<(i64, i64)> =
        sqlx::query_as("SELECT id, author_id FROM articles WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;
    match article {
        None => Err(RequestError::NotFound("Article not found")),
        Some((_, owner_id)) if owner_id != author_id => Err(RequestError::Forbidden),
        Some((article_id, _)) => Ok((article_id, author_id)),
    }
}

// ----------------- Article Queries -----------------

pub async fn list_articles_in_db(
    pool: &SqlitePool,
    viewer: Option<&str>,
    query: &ArticleQueryParams,
) -> Result<(Vec<Article>, i64), RequestError> {
    let filters = ArticleFilters::build(query, None);
    let mut conn = pool.acquire().await?;
    fetch_article_page(&mut conn, viewer, &filters, query.pagination()).await
}

pub async fn get_feed_in_db(
    pool: &SqlitePool,
    viewer: &str,
    pagination: Pagination,
) -> Result<(Vec<Article>, i64), RequestError> {
    let mut conn = pool.acquire().await?;
    let viewer_id = find_user_id_by_username(&mut conn, viewer).await?;
    let filters = ArticleFilters::build(
        &ArticleQueryParams::default(),
        Some(AuthorScope::FollowedBy(viewer_id)),
    );
    fetch_article_page(&mut conn, Some(viewer), &filters, pagination).await
}

pub async fn get_article_by_slug_in_db(
    pool: &SqlitePool,
    slug: &str,
    viewer: Option<&str>,
) -> Result<Option<Article>, RequestError> {
    let mut conn = pool.acquire().await?;
    Ok(fetch_article(&mut conn, slug, viewer).await?)
}

// Writers read their preconditions on a plain connection and open the
// transaction with its first write. A deferred transaction that has already
// read cannot wait for the write lock: SQLite fails it with SQLITE_BUSY.

pub async fn create_article_in_db(
    pool: &SqlitePool,
    username: &str,
    CreateArticleRequest {
        title,
        description,
        body,
        tag_list,
    }: CreateArticleRequest,
) -> Result<Article, RequestError> {
    if let Some(err) = RequestError::blank_fields([
        ("title", title.as_deref()),
        ("description", description.as_deref()),
        ("body", body.as_deref()),
    ]) {
        return Err(err);
    }
    let title = title.unwrap_or_default();

    let mut conn = pool.acquire().await?;
    let author_id = find_user_id_by_username(&mut conn, username).await?;
    let slug = article_slug(&title, author_id);
    ensure_slug_available(&mut conn, &slug, None).await?;
    drop(conn);

    let mut tx = pool.begin().await?;
    let article_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO articles (slug, title, description, body, author_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&slug)
    .bind(&title)
    .bind(description)
    .bind(body)
    .bind(author_id)
    .fetch_one(&mut tx)
    .await
    .map_err(slug_conflict)?;

    connect_tags(&mut tx, article_id, tag_list.unwrap_or_default()).await?;

    let article = fetch_article(&mut tx, &slug, Some(username))
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;
    tracing::info!(slug = %article.slug, author = %username, "created article");
    Ok(article)
}

pub async fn update_article_in_db(
    pool: &SqlitePool,
    username: &str,
    slug: &str,
    UpdateArticleRequest {
        title,
        description,
        body,
        tag_list,
    }: UpdateArticleRequest,
) -> Result<Article, RequestError> {
    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let title = non_blank(title);

    let mut conn = pool.acquire().await?;
    let (article_id, author_id) = owned_article_id(&mut conn, username, slug).await?;
    let new_slug = title.as_deref().map(|title| article_slug(title, author_id));
    if let Some(new_slug) = &new_slug {
        if new_slug != slug {
            ensure_slug_available(&mut conn, new_slug, Some(article_id)).await?;
        }
    }
    drop(conn);

    let (query, params) = QueryBuilder::new("UPDATE articles SET ", Some(", "))
        .add_param("title", title)
        .add_param("description", non_blank(description))
        .add_param("body", non_blank(body))
        .add_param("slug", new_slug.clone())
        .push(TOUCH_UPDATED_AT)
        .build();
    let query = format!("{query} WHERE id = ${}", params.len() + 1);
    let mut update = sqlx::query(&query);
    for param in params {
        update = update.bind(param);
    }

    let mut tx = pool.begin().await?;
    let updated = update
        .bind(article_id)
        .execute(&mut tx)
        .await
        .map_err(slug_conflict)?
        .rows_affected();
    if updated == 0 {
        return Err(RequestError::NotFound("Article not found"));
    }

    if let Some(tags) = tag_list {
        sqlx::query("DELETE FROM articletags WHERE article_id = $1")
            .bind(article_id)
            .execute(&mut tx)
            .await?;
        connect_tags(&mut tx, article_id, tags).await?;
    }

    let slug = new_slug.unwrap_or_else(|| slug.to_owned());
    let article = fetch_article(&mut tx, &slug, Some(username))
        .await?
        .ok_or(RequestError::NotFound("Article not found"))?;
    tx.commit().await?;
    Ok(article)
}

pub async fn delete_article_in_db(
    pool: &SqlitePool,
    username: &str,
    slug: &str,
) -> Result<(), RequestError> {
    let mut conn = pool.acquire().await?;
    let (article_id, _) = owned_article_id(&mut conn, username, slug).await?;
    sqlx::query("DELETE FROM articles WHERE id = $1")
        .bind(article_id)
        .execute(&mut *conn)
        .await?;
    tracing::info!(slug = %slug, author = %username, "deleted article");
    Ok(())
}

pub async fn favorite_article_in_db(
    pool: &SqlitePool,
    username: &str,
    slug: &str,
) -> Result<Article, RequestError> {
    let mut conn = pool.acquire().await?;
    let user_id = find_user_id_by_username(&mut conn, username).await?;
    let article_id = get_article_id_by_slug(&mut conn, slug).await?;

    sqlx::query("INSERT OR IGNORE INTO favourite (article_id, user_id) VALUES ($1, $2)")
        .bind(article_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    fetch_article(&mut conn, slug, Some(username))
        .await?
        .ok_or(RequestError::NotFound("Article not found"))
}

pub async fn unfavorite_article_in_db(
    pool: &SqlitePool,
    username: &str,
    slug: &str,
) -> Result<Article, RequestError> {
    let mut conn = pool.acquire().await?;
    let user_id = find_user_id_by_username(&mut conn, username).await?;
    let article_id = get_article_id_by_slug(&mut conn, slug).await?;

    sqlx::query("DELETE FROM favourite WHERE article_id = $1 AND user_id = $2")
        .bind(article_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    fetch_article(&mut conn, slug, Some(username))
        .await?
        .ok_or(RequestError::NotFound("Article not found"))
}
