use chrono::{DateTime, Utc};
use sqlx::types::Json;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
    pub bio: Option<String>,
}

/// An article row joined with its author and the viewer-relative flags.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tag names in the order they were attached.
    pub tag_list: Json<Vec<String>>,
    pub author_username: String,
    pub author_image: Option<String>,
    pub author_bio: Option<String>,
    pub favorites_count: i64,
    pub favorited: bool,
    pub following: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_image: Option<String>,
    pub author_bio: Option<String>,
    pub following: bool,
}
