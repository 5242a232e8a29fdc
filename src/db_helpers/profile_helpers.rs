use sqlx::{SqliteConnection, SqlitePool};

use crate::{errors::RequestError, models::User};

use super::{find_user_id_by_username, get_user_by_username};

/// Whether `viewer` is among the followers of the user with id `profile_id`.
async fn is_following(
    conn: &mut SqliteConnection,
    viewer: Option<&str>,
    profile_id: i64,
) -> Result<bool, sqlx::Error> {
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM follows
            JOIN users viewer ON viewer.id = follows.follower_id
            WHERE follows.followed_id = $1 AND viewer.username = $2
        )
        "#,
    )
    .bind(profile_id)
    .bind(viewer)
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_profile_in_db(
    pool: &SqlitePool,
    viewer: Option<&str>,
    username: &str,
) -> Result<(User, bool), RequestError> {
    let mut conn = pool.acquire().await?;
    let profile = get_user_by_username(&mut conn, username)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    let following = is_following(&mut conn, viewer, profile.id).await?;
    Ok((profile, following))
}

/// Idempotent: following twice leaves a single relation.
pub async fn follow_user_in_db(
    pool: &SqlitePool,
    follower: &str,
    profile: &str,
) -> Result<User, RequestError> {
    let mut conn = pool.acquire().await?;
    let follower_id = find_user_id_by_username(&mut conn, follower).await?;
    let profile = get_user_by_username(&mut conn, profile)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    sqlx::query("INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES ($1, $2)")
        .bind(follower_id)
        .bind(profile.id)
        .execute(&mut *conn)
        .await?;
    Ok(profile)
}

pub async fn unfollow_user_in_db(
    pool: &SqlitePool,
    follower: &str,
    profile: &str,
) -> Result<User, RequestError> {
    let mut conn = pool.acquire().await?;
    let follower_id = find_user_id_by_username(&mut conn, follower).await?;
    let profile = get_user_by_username(&mut conn, profile)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(follower_id)
        .bind(profile.id)
        .execute(&mut *conn)
        .await?;
    Ok(profile)
}
