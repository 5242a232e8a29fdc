use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use sqlx::types::Json;

use crate::models::{Article, Comment, User};

#[derive(Deserialize, Serialize, Debug)]
pub struct UserResponse {
    pub email: String,
    pub token: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub following: bool,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: ProfileResponse,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub body: String,
    pub author: ProfileResponse,
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl UserResponse {
    pub fn new(
        User {
            username,
            email,
            bio,
            image,
            ..
        }: User,
        token: String,
    ) -> Self {
        UserResponse {
            username,
            email,
            bio,
            image,
            token,
        }
    }
}

impl ProfileResponse {
    pub fn new(
        User {
            username,
            bio,
            image,
            ..
        }: User,
        following: bool,
    ) -> Self {
        ProfileResponse {
            username,
            bio,
            image,
            following,
        }
    }

    /// Nobody follows anyone from an anonymous point of view.
    pub fn for_viewer(mut self, viewer: Option<&str>) -> Self {
        self.following &= viewer.is_some();
        self
    }
}

impl CommentResponse {
    pub fn new(comment: Comment, viewer: Option<&str>) -> Self {
        let Comment {
            id,
            body,
            created_at,
            updated_at,
            author_username,
            author_image,
            author_bio,
            following,
            ..
        } = comment;
        CommentResponse {
            id,
            created_at: timestamp(created_at),
            updated_at: timestamp(updated_at),
            body,
            author: ProfileResponse {
                username: author_username,
                bio: author_bio,
                image: author_image,
                following,
            }
            .for_viewer(viewer),
        }
    }
}

impl ArticleResponse {
    pub fn new(article: Article, viewer: Option<&str>) -> Self {
        let Article {
            slug,
            title,
            description,
            body,
            created_at,
            updated_at,
            tag_list: Json(tag_list),
            favorited,
            favorites_count,
            author_username,
            author_image,
            author_bio,
            following,
            ..
        } = article;
        ArticleResponse {
            slug,
            title,
            description,
            body,
            tag_list,
            created_at: timestamp(created_at),
            updated_at: timestamp(updated_at),
            favorited: favorited && viewer.is_some(),
            favorites_count,
            author: ProfileResponse {
                username: author_username,
                bio: author_bio,
                image: author_image,
                following,
            }
            .for_viewer(viewer),
        }
    }
}
