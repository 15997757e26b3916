//! Notion-backed blog backend: cached upstream fetches, property decoding and
//! the published post list.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
