use sqlx::SqlitePool;

use crate::errors::RequestError;

pub const POPULAR_TAGS_LIMIT: i64 = 10;

/// Most used tag names first. With `author`, only that author's articles count.
pub async fn get_tags_in_db(
    pool: &SqlitePool,
    author: Option<&str>,
) -> Result<Vec<String>, RequestError> {
    let result = sqlx::query_scalar::<_, String>(
        r#"
        SELECT tags.name
        FROM   tags
               JOIN articletags
                 ON articletags.tag_id = tags.id
               JOIN articles
                 ON articles.id = articletags.article_id
               JOIN users
                 ON users.id = articles.author_id
        WHERE  $1 IS NULL OR users.username = $1
        GROUP  BY tags.id, tags.name
        ORDER  BY Count(*) DESC, tags.name ASC
        LIMIT  $2
        "#,
    )
    .bind(author)
    .bind(POPULAR_TAGS_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(result)
}
