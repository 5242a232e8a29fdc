use sqlx::SqliteConnection;

use crate::{errors::RequestError, models::User};

mod article_helpers;
mod cleanup_helpers;
mod comment_helpers;
mod filters;
mod profile_helpers;
mod tag_helpers;
mod user_helpers;

pub use article_helpers::*;
pub use cleanup_helpers::*;
pub use comment_helpers::*;
pub use filters::*;
pub use profile_helpers::*;
pub use tag_helpers::*;
pub use user_helpers::*;

/// Builds `column = $n` lists (e.g. the `SET` part of an update) with
/// numbered placeholders, skipping every column whose value is absent.
struct QueryBuilder {
    query: String,
    params: Vec<String>,
    seperator: Option<&'static str>,
    counter: usize,
}

impl QueryBuilder {
    fn new(initial: &str, seperator: Option<&'static str>) -> Self {
        Self {
            query: initial.to_owned(),
            params: vec![],
            seperator,
            counter: 0,
        }
    }

    fn add_param(mut self, column: &str, param: Option<String>) -> Self {
        if let Some(value) = param {
            let filter = format!("{} = ${}", column, self.params.len() + 1);
            self = self.push(&filter);
            self.params.push(value);
        }
        self
    }

    /// Appends a fragment that carries no parameter.
    fn push(mut self, fragment: &str) -> Self {
        self.query.push_str(fragment);
        if let Some(seperator) = self.seperator {
            self.query.push_str(seperator);
        }
        self.counter += 1;
        self
    }

    fn is_empty(&self) -> bool {
        self.counter == 0
    }

    fn trim(mut self) -> Self {
        if let Some(seperator) = self.seperator {
            self.query = self.query.trim_end_matches(seperator).to_string();
        }
        self
    }

    fn build(mut self) -> (String, Vec<String>) {
        self = self.trim();
        (self.query, self.params)
    }
}

// ----------------- Helper Functions -----------------

const USER_COLUMNS: &str = "id, username, email, password, image, bio";

pub async fn get_user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn get_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn get_user_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_user_id_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<i64, RequestError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
    id.ok_or(RequestError::NotFound("User not found"))
}

pub async fn get_article_id_by_slug(
    conn: &mut SqliteConnection,
    slug: &str,
) -> Result<i64, RequestError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM articles WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    id.ok_or(RequestError::NotFound("Article not found"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use sqlx::SqlitePool;

    use crate::{
        authentication::hash_password_argon2,
        db_helpers::{insert_user, NewUser},
        init_db, init_db_pool,
    };

    pub async fn pool() -> SqlitePool {
        init_db_pool("sqlite::memory:").await.unwrap()
    }

    /// A database file of its own, for tests that need several connections.
    pub async fn file_pool(name: &str) -> (SqlitePool, PathBuf) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "conduit-{name}-{}-{nanos}.db",
            std::process::id()
        ));
        let pool = init_db(&format!("sqlite://{}", path.display()))
            .await
            .unwrap();
        (pool, path)
    }

    pub async fn remove_file_pool(pool: SqlitePool, path: PathBuf) {
        pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }

    pub async fn user(pool: &SqlitePool, username: &str) -> i64 {
        let password = hash_password_argon2("password".to_owned()).await.unwrap();
        insert_user(
            pool,
            NewUser {
                username,
                email: &format!("{username}@example.com"),
                password: &password,
                image: None,
                demo: false,
            },
        )
        .await
        .unwrap()
        .id
    }

    pub async fn follow(pool: &SqlitePool, follower: &str, followed: &str) {
        crate::db_helpers::follow_user_in_db(pool, follower, followed)
            .await
            .unwrap();
    }
}
