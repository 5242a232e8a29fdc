mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use serde::{Deserialize, Serialize};

use crate::db_helpers::Pagination;

/// `GET /articles` query string. Pagination values stay strings so that
/// garbage input falls back to the defaults instead of rejecting the request.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct ArticleQueryParams {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub favorited: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

impl ArticleQueryParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::parse(self.offset.as_deref(), self.limit.as_deref())
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct FeedQueryParams {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

impl FeedQueryParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::parse(self.offset.as_deref(), self.limit.as_deref())
    }
}

/// Optional `?author=` narrowing used by the comment and tag listings.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AuthorQueryParams {
    #[serde(default)]
    pub author: Option<String>,
}
