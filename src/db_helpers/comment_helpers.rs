use sqlx::SqlitePool;

use crate::{
    data_formats::CommentRequest,
    errors::RequestError,
    models::Comment,
};

use super::{find_user_id_by_username, get_article_id_by_slug};

// `$1` is the viewer's username, used for the author's `following` flag.
const COMMENT_QUERY: &str = r#"
            SELECT comments.id                                AS "id",
                   comments.body                              AS "body",
                   comments.created_at                        AS "created_at",
                   comments.updated_at                        AS "updated_at",
                   users.username                             AS "author_username",
                   users.image                                AS "author_image",
                   users.bio                                  AS "author_bio",
                   EXISTS (SELECT 1
                           FROM   follows
                                  JOIN users viewer
                                    ON viewer.id = follows.follower_id
                           WHERE  follows.followed_id = comments.author_id
                                  AND viewer.username = $1)  AS "following"
            FROM   comments
                   JOIN users
                     ON comments.author_id = users.id
"#;

/// Comments of one article, oldest first, optionally narrowed to one author.
pub async fn get_comments_for_article_in_db(
    pool: &SqlitePool,
    slug: &str,
    viewer: Option<&str>,
    author: Option<&str>,
) -> Result<Vec<Comment>, RequestError> {
    let mut conn = pool.acquire().await?;
    let article_id = get_article_id_by_slug(&mut conn, slug).await?;
    let result = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_QUERY} \
         WHERE comments.article_id = $2 AND ($3 IS NULL OR users.username = $3) \
         ORDER BY comments.created_at, comments.id"
    ))
    .bind(viewer)
    .bind(article_id)
    .bind(author)
    .fetch_all(&mut *conn)
    .await?;
    Ok(result)
}

pub async fn add_comment_to_article_in_db(
    pool: &SqlitePool,
    username: &str,
    slug: &str,
    CommentRequest { body }: CommentRequest,
) -> Result<Comment, RequestError> {
    if let Some(err) = RequestError::blank_fields([("body", body.as_deref())]) {
        return Err(err);
    }

    let mut conn = pool.acquire().await?;
    let author_id = find_user_id_by_username(&mut conn, username).await?;
    let article_id = get_article_id_by_slug(&mut conn, slug).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (body, author_id, article_id)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(body)
    .bind(author_id)
    .bind(article_id)
    .fetch_one(&mut *conn)
    .await?;

    let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_QUERY} WHERE comments.id = $2"))
        .bind(username)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(comment)
}

/// Only the comment's author can delete it; for anyone else the comment does not exist.
pub async fn delete_comment_in_db(
    pool: &SqlitePool,
    username: &str,
    slug: &str,
    comment_id: i64,
) -> Result<(), RequestError> {
    let mut conn = pool.acquire().await?;
    let article_id = get_article_id_by_slug(&mut conn, slug).await?;
    let comment: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT comments.id
        FROM   comments
               JOIN users
                 ON comments.author_id = users.id
        WHERE  comments.id = $1
               AND comments.article_id = $2
               AND users.username = $3
        "#,
    )
    .bind(comment_id)
    .bind(article_id)
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;

    let comment_id = comment.ok_or(RequestError::NotFound("Comment not found"))?;
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
