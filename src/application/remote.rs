//! Port describing the remote document API.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::record_map::{NotionUser, RecordMap, RecordTable};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to `{endpoint}` failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("`{endpoint}` responded with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("could not decode `{endpoint}` response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl RemoteError {
    pub fn transport(endpoint: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint,
            message: err.to_string(),
        }
    }

    pub fn decode(endpoint: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            endpoint,
            message: err.to_string(),
        }
    }
}

/// The two calls the post pipeline makes against Notion.
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// Fetch the record map of a page, including collection query results
    /// when the page is a database.
    async fn fetch_page(&self, page_id: &str) -> Result<RecordMap, RemoteError>;

    /// Fetch user records in one batch. Unknown ids are simply absent.
    async fn fetch_users(&self, user_ids: &[String])
    -> Result<RecordTable<NotionUser>, RemoteError>;
}
