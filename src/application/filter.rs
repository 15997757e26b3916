//! Publication predicates over decoded posts.

use crate::domain::post::{Post, SLUG_PROPERTY, TITLE_PROPERTY};

pub const POST_TYPE: &str = "Post";
pub const PAGE_TYPE: &str = "Page";
pub const PUBLISHED_STATUS: &str = "Published";

/// Keep the posts a visitor may see at `now_ms`.
///
/// A post survives when all of these hold:
/// - its type is `Post`, or `Page` while `include_pages` is set;
/// - it has a non-empty title and slug;
/// - its status is `Published`;
/// - its date is not in the future.
///
/// The input is left untouched and survivors keep their relative order.
pub fn filter_published(posts: &[Post], include_pages: bool, now_ms: i64) -> Vec<Post> {
    posts
        .iter()
        .filter(|post| is_published(post, include_pages, now_ms))
        .cloned()
        .collect()
}

pub fn is_published(post: &Post, include_pages: bool, now_ms: i64) -> bool {
    let type_allowed = match post.kind() {
        Some(POST_TYPE) => true,
        Some(PAGE_TYPE) => include_pages,
        _ => false,
    };

    type_allowed
        && post.has_value(TITLE_PROPERTY)
        && post.has_value(SLUG_PROPERTY)
        && post.status() == Some(PUBLISHED_STATUS)
        && post.date <= now_ms
}
