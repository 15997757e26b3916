//! Domain layer: wire shapes read from Notion and the decoded post model.

pub mod ids;
pub mod post;
pub mod record_map;
pub mod rich_text;
