/// Lowercase, hyphenated, ASCII-only form of `input`.
pub fn slugify(input: &str) -> String {
    slug::slugify(input)
}

/// Article slugs carry the author id so equal titles from different authors never collide.
pub fn article_slug(title: &str, author_id: i64) -> String {
    format!("{}-{}", slugify(title), author_id)
}
