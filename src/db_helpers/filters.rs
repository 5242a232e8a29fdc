//! Composition of the `WHERE` clause shared by article listings and feeds.
//!
//! A filter set is a conjunction of predicates. Every predicate is rendered
//! against the `articles` table joined with its author as `users`, and binds
//! its values through numbered placeholders so that the same set can drive
//! both the count query and the page query.

use crate::data_formats::ArticleQueryParams;

pub const DEFAULT_OFFSET: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Unparseable, negative or (for `limit`) zero values fall back to the defaults.
    pub fn parse(offset: Option<&str>, limit: Option<&str>) -> Self {
        let offset = offset
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .unwrap_or(DEFAULT_OFFSET);
        let limit = limit
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LIMIT);
        Self { offset, limit }
    }
}

/// Restricts which authors' articles are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorScope {
    /// Written by this username.
    Author(String),
    /// Written by someone the user with this id follows.
    FollowedBy(i64),
}

/// A value bound to one rendered placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterParam {
    Text(String),
    Id(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticlePredicate {
    /// Disjunction of author scopes. Empty means no author constraint.
    AnyAuthor(Vec<AuthorScope>),
    /// Carries a tag with this name.
    Tagged(String),
    /// Favorited by this username.
    FavoritedBy(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleFilters {
    predicates: Vec<ArticlePredicate>,
}

fn bind(first_placeholder: usize, params: &mut Vec<FilterParam>, value: FilterParam) -> String {
    params.push(value);
    format!("${}", first_placeholder + params.len() - 1)
}

fn bind_text(first_placeholder: usize, params: &mut Vec<FilterParam>, value: &str) -> String {
    bind(first_placeholder, params, FilterParam::Text(value.to_owned()))
}

impl AuthorScope {
    fn render(&self, first_placeholder: usize, params: &mut Vec<FilterParam>) -> String {
        match self {
            AuthorScope::Author(username) => {
                format!("users.username = {}", bind_text(first_placeholder, params, username))
            }
            AuthorScope::FollowedBy(follower_id) => format!(
                "articles.author_id IN (SELECT follows.followed_id FROM follows \
                 WHERE follows.follower_id = {})",
                bind(first_placeholder, params, FilterParam::Id(*follower_id))
            ),
        }
    }
}

impl ArticlePredicate {
    fn render(&self, first_placeholder: usize, params: &mut Vec<FilterParam>) -> String {
        match self {
            ArticlePredicate::AnyAuthor(scopes) if scopes.is_empty() => "1 = 1".to_owned(),
            ArticlePredicate::AnyAuthor(scopes) => {
                let alternatives: Vec<String> = scopes
                    .iter()
                    .map(|scope| scope.render(first_placeholder, params))
                    .collect();
                format!("({})", alternatives.join(" OR "))
            }
            ArticlePredicate::Tagged(tag) => format!(
                "EXISTS (SELECT 1 FROM articletags \
                 JOIN tags ON tags.id = articletags.tag_id \
                 WHERE articletags.article_id = articles.id AND tags.name = {})",
                bind_text(first_placeholder, params, tag)
            ),
            ArticlePredicate::FavoritedBy(username) => format!(
                "EXISTS (SELECT 1 FROM favourite \
                 JOIN users fan ON fan.id = favourite.user_id \
                 WHERE favourite.article_id = articles.id AND fan.username = {})",
                bind_text(first_placeholder, params, username)
            ),
        }
    }
}

impl ArticleFilters {
    /// Author group first (explicit `author` OR'd with `scope`), then tag,
    /// then favorited-by. Absent keys add no constraint.
    pub fn build(query: &ArticleQueryParams, scope: Option<AuthorScope>) -> Self {
        let mut authors = Vec::new();
        authors.extend(scope);
        if let Some(author) = &query.author {
            authors.push(AuthorScope::Author(author.clone()));
        }

        let mut predicates = vec![ArticlePredicate::AnyAuthor(authors)];
        if let Some(tag) = &query.tag {
            predicates.push(ArticlePredicate::Tagged(tag.clone()));
        }
        if let Some(favorited) = &query.favorited {
            predicates.push(ArticlePredicate::FavoritedBy(favorited.clone()));
        }
        Self { predicates }
    }

    pub fn predicates(&self) -> &[ArticlePredicate] {
        &self.predicates
    }

    /// Renders the conjunction, numbering placeholders from `first_placeholder`.
    pub fn to_sql(&self, first_placeholder: usize) -> (String, Vec<FilterParam>) {
        let mut params = Vec::new();
        let clauses: Vec<String> = self
            .predicates
            .iter()
            .map(|predicate| predicate.render(first_placeholder, &mut params))
            .collect();
        if clauses.is_empty() {
            return ("1 = 1".to_owned(), params);
        }
        (clauses.join(" AND "), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(author: Option<&str>, tag: Option<&str>, favorited: Option<&str>) -> ArticleQueryParams {
        ArticleQueryParams {
            author: author.map(str::to_owned),
            tag: tag.map(str::to_owned),
            favorited: favorited.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn pagination_defaults() {
        assert_eq!(Pagination::parse(None, None), Pagination { offset: 0, limit: 10 });
        assert_eq!(
            Pagination::parse(Some("abc"), Some("x1")),
            Pagination { offset: 0, limit: 10 }
        );
        assert_eq!(
            Pagination::parse(Some("-3"), Some("0")),
            Pagination { offset: 0, limit: 10 }
        );
        assert_eq!(
            Pagination::parse(Some("20"), Some("5")),
            Pagination { offset: 20, limit: 5 }
        );
    }

    #[test]
    fn no_filters_means_no_constraint() {
        let filters = ArticleFilters::build(&ArticleQueryParams::default(), None);
        assert_eq!(filters.predicates(), &[ArticlePredicate::AnyAuthor(vec![])]);
        let (sql, params) = filters.to_sql(1);
        assert_eq!(sql, "1 = 1");
        assert!(params.is_empty());
    }

    #[test]
    fn all_filters_are_conjoined_in_order() {
        let filters = ArticleFilters::build(&params(Some("alice"), Some("rust"), Some("bob")), None);
        assert_eq!(
            filters.predicates(),
            &[
                ArticlePredicate::AnyAuthor(vec![AuthorScope::Author("alice".into())]),
                ArticlePredicate::Tagged("rust".into()),
                ArticlePredicate::FavoritedBy("bob".into()),
            ]
        );
        let (sql, params) = filters.to_sql(2);
        assert_eq!(
            params,
            vec![
                FilterParam::Text("alice".into()),
                FilterParam::Text("rust".into()),
                FilterParam::Text("bob".into()),
            ]
        );
        assert!(sql.starts_with("(users.username = $2) AND EXISTS"));
        assert!(sql.contains("tags.name = $3"));
        assert!(sql.contains("fan.username = $4"));
        assert_eq!(sql.matches(" AND EXISTS").count(), 2);
    }

    #[test]
    fn scope_and_author_are_alternatives() {
        let filters = ArticleFilters::build(
            &params(Some("carol"), None, None),
            Some(AuthorScope::FollowedBy(7)),
        );
        let (sql, params) = filters.to_sql(1);
        assert_eq!(
            params,
            vec![FilterParam::Id(7), FilterParam::Text("carol".into())]
        );
        assert!(sql.starts_with("(articles.author_id IN"));
        assert!(sql.contains("follows.follower_id = $1"));
        assert!(sql.ends_with(" OR users.username = $2)"));
    }

    #[test]
    fn scope_alone() {
        let filters = ArticleFilters::build(
            &ArticleQueryParams::default(),
            Some(AuthorScope::FollowedBy(7)),
        );
        assert_eq!(
            filters.predicates(),
            &[ArticlePredicate::AnyAuthor(vec![AuthorScope::FollowedBy(7)])]
        );
    }
}
