//! HTTP adapter for Notion's private `/api/v3` endpoints.

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderValue};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::application::remote::{NotionApi, RemoteError};
use crate::config::NotionSettings;
use crate::domain::record_map::{
    DATABASE_BLOCK_TYPES, NotionUser, RecordMap, RecordTable, ViewResult,
};

const LOAD_PAGE_CHUNK: &str = "loadPageChunk";
const QUERY_COLLECTION: &str = "queryCollection";
const SYNC_RECORD_VALUES: &str = "syncRecordValues";
const PAGE_CHUNK_LIMIT: u32 = 100;
const COLLECTION_QUERY_LIMIT: u32 = 999;

#[derive(Clone, Debug)]
pub struct NotionClient {
    http: Client,
    base: Url,
    token: Option<String>,
    user_time_zone: String,
}

impl NotionClient {
    pub fn new(settings: &NotionSettings, user_time_zone: &str) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| RemoteError::Configuration(err.to_string()))?;
        Ok(Self {
            http,
            base: settings.api_base_url.clone(),
            token: settings.token.clone(),
            user_time_zone: user_time_zone.to_string(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("quire/", env!("CARGO_PKG_VERSION"))
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: &Value,
    ) -> Result<T, RemoteError> {
        let url = self
            .base
            .join(endpoint)
            .map_err(|err| RemoteError::Configuration(format!("invalid endpoint url: {err}")))?;

        let mut request = self.http.post(url).json(body);
        if let Some(token) = self.token.as_deref() {
            let cookie = HeaderValue::from_str(&format!("token_v2={token}"))
                .map_err(|err| RemoteError::Configuration(format!("invalid token: {err}")))?;
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RemoteError::transport(endpoint, err))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RemoteError::transport(endpoint, err))?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                endpoint,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|err| RemoteError::decode(endpoint, err))
    }

    async fn query_collection(
        &self,
        collection_id: &str,
        view_id: &str,
    ) -> Result<QueryCollectionResponse, RemoteError> {
        let body = json!({
            "collection": { "id": collection_id },
            "collectionView": { "id": view_id },
            "loader": {
                "type": "reducer",
                "reducers": {
                    "collection_group_results": {
                        "type": "results",
                        "limit": COLLECTION_QUERY_LIMIT
                    }
                },
                "searchQuery": "",
                "userTimeZone": self.user_time_zone
            }
        });
        self.post(QUERY_COLLECTION, &body).await
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_page(&self, page_id: &str) -> Result<RecordMap, RemoteError> {
        let body = json!({
            "pageId": page_id,
            "limit": PAGE_CHUNK_LIMIT,
            "cursor": { "stack": [] },
            "chunkNumber": 0,
            "verticalColumns": false
        });
        let chunk: LoadPageChunkResponse = self.post(LOAD_PAGE_CHUNK, &body).await?;
        let mut record_map = chunk.record_map;

        let views: Vec<(String, String)> = record_map
            .block
            .values()
            .filter_map(|record| record.value.as_ref())
            .filter(|block| DATABASE_BLOCK_TYPES.contains(&block.kind.as_str()))
            .filter_map(|block| {
                let collection_id = block.collection_id.clone()?;
                Some(
                    block
                        .view_ids
                        .iter()
                        .map(move |view_id| (collection_id.clone(), view_id.clone())),
                )
            })
            .flatten()
            .collect();

        // A failed view query is skipped.
        for (collection_id, view_id) in views {
            let query = match self.query_collection(&collection_id, &view_id).await {
                Ok(query) => query,
                Err(err) => {
                    warn!(
                        collection_id,
                        view_id,
                        error = %err,
                        "collection view query failed"
                    );
                    continue;
                }
            };
            debug!(
                collection_id,
                view_id,
                blocks = query.record_map.block.len(),
                "queried collection view"
            );
            record_map
                .collection_query
                .entry(collection_id)
                .or_default()
                .insert(view_id, query.result.reducer_results);
            for (id, record) in query.record_map.block {
                record_map.block.entry(id).or_insert(record);
            }
            for (id, record) in query.record_map.collection {
                record_map.collection.entry(id).or_insert(record);
            }
        }

        Ok(record_map)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_users(
        &self,
        user_ids: &[String],
    ) -> Result<RecordTable<NotionUser>, RemoteError> {
        let requests: Vec<Value> = user_ids
            .iter()
            .map(|id| {
                json!({
                    "pointer": { "table": "notion_user", "id": id },
                    "version": -1
                })
            })
            .collect();
        let response: SyncRecordValuesResponse = self
            .post(SYNC_RECORD_VALUES, &json!({ "requests": requests }))
            .await?;
        Ok(response.record_map.notion_user)
    }
}

#[derive(Debug, Deserialize)]
struct LoadPageChunkResponse {
    #[serde(rename = "recordMap", default)]
    record_map: RecordMap,
}

#[derive(Debug, Deserialize)]
struct QueryCollectionResponse {
    #[serde(default)]
    result: QueryResult,
    #[serde(rename = "recordMap", default)]
    record_map: RecordMap,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResult {
    #[serde(rename = "reducerResults", default)]
    reducer_results: ViewResult,
}

#[derive(Debug, Deserialize)]
struct SyncRecordValuesResponse {
    #[serde(rename = "recordMapWithRoles", alias = "recordMap", default)]
    record_map: UserRecordMap,
}

#[derive(Debug, Default, Deserialize)]
struct UserRecordMap {
    #[serde(default)]
    notion_user: RecordTable<NotionUser>,
}
