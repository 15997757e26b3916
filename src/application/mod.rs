//! Application services layer.

pub mod error;
pub mod fetchers;
pub mod filter;
pub mod page_ids;
pub mod posts;
pub mod properties;
pub mod remote;
