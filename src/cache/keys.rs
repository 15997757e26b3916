//! Cache key definitions.
//!
//! The rendered form is part of the contract: other consumers co-located on
//! the same store rely on the `page_<id>` and `user_<id>` keyspaces.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A fetched record map, keyed by the page id it was requested with.
    Page(String),
    /// A normalized Notion user.
    User(String),
}

impl CacheKey {
    pub fn page(id: impl Into<String>) -> Self {
        Self::Page(id.into())
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Page(id) => write!(f, "page_{id}"),
            CacheKey::User(id) => write!(f, "user_{id}"),
        }
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_with_keyspace_prefix() {
        assert_eq!(CacheKey::page("abc").to_string(), "page_abc");
        assert_eq!(CacheKey::user("42").to_string(), "user_42");
    }

    #[test]
    fn page_and_user_keys_never_collide() {
        assert_ne!(
            CacheKey::page("same").to_string(),
            CacheKey::user("same").to_string()
        );
    }
}
