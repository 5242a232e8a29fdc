use sqlx::SqlitePool;

use crate::{
    authentication::hash_password_argon2, data_formats::CreateArticleRequest,
    errors::RequestError,
};

use super::{create_article_in_db, get_user_by_username, insert_user, NewUser};

pub const DEMO_USERNAME: &str = "Gerome";
pub const DEMO_EMAIL: &str = "gerome@me";
pub const DEMO_IMAGE: &str = "https://realworld-temp-api.herokuapp.com/images/demo-avatar.png";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub comments: u64,
    pub articles: u64,
    pub tags: u64,
}

/// Removes everything written by non-demo users, then every tag left without an article.
/// Demo users, their articles and the tags those articles use survive.
pub async fn purge_non_demo_content_in_db(pool: &SqlitePool) -> Result<CleanupReport, RequestError> {
    let mut tx = pool.begin().await?;

    let comments = sqlx::query(
        "DELETE FROM comments WHERE author_id IN (SELECT id FROM users WHERE demo = 0)",
    )
    .execute(&mut tx)
    .await?
    .rows_affected();

    let articles = sqlx::query(
        "DELETE FROM articles WHERE author_id IN (SELECT id FROM users WHERE demo = 0)",
    )
    .execute(&mut tx)
    .await?
    .rows_affected();

    let tags = sqlx::query(
        r#"
        DELETE FROM tags
        WHERE NOT EXISTS (SELECT 1 FROM articletags WHERE articletags.tag_id = tags.id)
        "#,
    )
    .execute(&mut tx)
    .await?
    .rows_affected();

    tx.commit().await?;
    Ok(CleanupReport {
        comments,
        articles,
        tags,
    })
}

/// Creates the demo account and its welcome article. Returns `false` when it already exists.
pub async fn seed_demo_data_in_db(pool: &SqlitePool, password: &str) -> Result<bool, RequestError> {
    let mut conn = pool.acquire().await?;
    if get_user_by_username(&mut conn, DEMO_USERNAME).await?.is_some() {
        return Ok(false);
    }
    drop(conn);

    let password = hash_password_argon2(password.to_owned())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            RequestError::ServerError
        })?;
    insert_user(
        pool,
        NewUser {
            username: DEMO_USERNAME,
            email: DEMO_EMAIL,
            password: &password,
            image: Some(DEMO_IMAGE),
            demo: true,
        },
    )
    .await?;

    create_article_in_db(
        pool,
        DEMO_USERNAME,
        CreateArticleRequest {
            title: Some("Welcome to RealWorld project".into()),
            description: Some(
                "Exemplary fullstack Medium.com clone powered by React, Angular, Node, Django, and many more"
                    .into(),
            ),
            body: Some(
                "See how the exact same Medium.com clone (called Conduit) is built using different frontends and backends. Yes, you can mix and match them, because they all adhere to the same API spec"
                    .into(),
            ),
            tag_list: Some(vec!["welcome".into(), "introduction".into()]),
        },
    )
    .await?;
    tracing::info!(username = DEMO_USERNAME, "seeded demo data");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_formats::{ArticleQueryParams, CommentRequest};
    use crate::db_helpers::{
        add_comment_to_article_in_db, get_comments_for_article_in_db, get_tags_in_db,
        list_articles_in_db, test_support,
    };

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = test_support::pool().await;
        assert!(seed_demo_data_in_db(&pool, "123456").await.unwrap());
        assert!(!seed_demo_data_in_db(&pool, "123456").await.unwrap());

        let (articles, count) = list_articles_in_db(&pool, None, &ArticleQueryParams::default())
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(articles[0].author_username, DEMO_USERNAME);
        assert_eq!(articles[0].tag_list.0, vec!["welcome".to_owned(), "introduction".to_owned()]);
    }

    #[tokio::test]
    async fn purge_keeps_demo_content_only() {
        let pool = test_support::pool().await;
        seed_demo_data_in_db(&pool, "123456").await.unwrap();
        test_support::user(&pool, "alice").await;
        let alices = create_article_in_db(
            &pool,
            "alice",
            CreateArticleRequest {
                title: Some("Temporary".into()),
                description: Some("d".into()),
                body: Some("b".into()),
                tag_list: Some(vec!["welcome".into(), "ephemeral".into()]),
            },
        )
        .await
        .unwrap();
        let (demo_articles, _) = list_articles_in_db(&pool, None, &ArticleQueryParams::default())
            .await
            .unwrap();
        let welcome = demo_articles
            .iter()
            .find(|a| a.author_username == DEMO_USERNAME)
            .unwrap()
            .slug
            .clone();
        let comment = |body: &str| CommentRequest {
            body: Some(body.into()),
        };
        add_comment_to_article_in_db(&pool, "alice", &welcome, comment("hi"))
            .await
            .unwrap();
        add_comment_to_article_in_db(&pool, DEMO_USERNAME, &welcome, comment("hello"))
            .await
            .unwrap();
        add_comment_to_article_in_db(&pool, DEMO_USERNAME, &alices.slug, comment("gone"))
            .await
            .unwrap();

        let report = purge_non_demo_content_in_db(&pool).await.unwrap();
        assert_eq!(report.articles, 1);
        assert_eq!(report.comments, 1);
        assert_eq!(report.tags, 1);

        let (remaining, count) = list_articles_in_db(&pool, None, &ArticleQueryParams::default())
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(remaining[0].slug, welcome);

        let comments = get_comments_for_article_in_db(&pool, &welcome, None, None)
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "hello");

        let mut tags = get_tags_in_db(&pool, None).await.unwrap();
        tags.sort();
        assert_eq!(tags, vec!["introduction", "welcome"]);
    }
}
