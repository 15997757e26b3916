//! Cache-backed wrappers around the Notion API.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::application::remote::{NotionApi, RemoteError};
use crate::cache::{CacheKey, CachedValue, NotionCache};
use crate::domain::post::User;
use crate::domain::record_map::RecordMap;

#[derive(Clone)]
pub struct NotionFetcher {
    api: Arc<dyn NotionApi>,
    cache: Arc<NotionCache>,
}

impl NotionFetcher {
    pub fn new(api: Arc<dyn NotionApi>, cache: Arc<NotionCache>) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &Arc<NotionCache> {
        &self.cache
    }

    /// Fetch a page record map, serving it from `page_<id>` while fresh.
    ///
    /// Failures propagate and are never cached.
    pub async fn get_page_with_cache(
        &self,
        page_id: &str,
    ) -> Result<Arc<RecordMap>, RemoteError> {
        let key = CacheKey::page(page_id).to_string();
        if let Some(CachedValue::Page(page)) = self.cache.get(&key) {
            debug!(page_id, "page served from cache");
            return Ok(page);
        }

        match self.api.fetch_page(page_id).await {
            Ok(page) => {
                let page = Arc::new(page);
                self.cache.set(key, CachedValue::Page(page.clone()));
                Ok(page)
            }
            Err(err) => {
                warn!(page_id, error = %err, "failed to fetch page");
                Err(err)
            }
        }
    }

    /// Resolve users by id, consulting `user_<id>` entries first and fetching
    /// the rest in a single batch.
    ///
    /// Never fails: ids that cannot be resolved are absent from the result.
    /// Cached users come first, then newly fetched ones in response order.
    pub async fn get_users_with_cache(&self, user_ids: &[String]) -> IndexMap<String, User> {
        let unique: IndexSet<&str> = user_ids.iter().map(String::as_str).collect();
        let mut users = IndexMap::with_capacity(unique.len());
        let mut to_fetch = Vec::new();

        for user_id in unique {
            match self.cache.get(&CacheKey::user(user_id).to_string()) {
                Some(CachedValue::User(user)) => {
                    users.insert(user_id.to_string(), user);
                }
                _ => to_fetch.push(user_id.to_string()),
            }
        }

        if to_fetch.is_empty() {
            return users;
        }

        match self.api.fetch_users(&to_fetch).await {
            Ok(records) => {
                for user in records.into_values().filter_map(|record| record.value) {
                    if user.id.is_empty() {
                        continue;
                    }
                    let user = User::from(user);
                    self.cache
                        .set(CacheKey::user(&user.id), CachedValue::User(user.clone()));
                    users.insert(user.id.clone(), user);
                }
            }
            Err(err) => {
                warn!(
                    requested = to_fetch.len(),
                    error = %err,
                    "failed to fetch users; continuing with cached users"
                );
            }
        }

        users
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::domain::record_map::{NotionUser, Record, RecordTable};

    /// In-memory Notion double that counts calls.
    #[derive(Default)]
    pub(crate) struct FakeNotion {
        pub pages: Mutex<IndexMap<String, RecordMap>>,
        pub users: Mutex<IndexMap<String, NotionUser>>,
        pub fail_users: bool,
        pub page_calls: AtomicUsize,
        pub user_calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeNotion {
        pub fn with_page(self, id: &str, page: RecordMap) -> Self {
            self.pages
                .lock()
                .expect("pages lock")
                .insert(id.to_string(), page);
            self
        }

        pub fn with_user(self, id: &str, given: &str) -> Self {
            self.users.lock().expect("users lock").insert(
                id.to_string(),
                NotionUser {
                    id: id.to_string(),
                    given_name: Some(given.to_string()),
                    ..NotionUser::default()
                },
            );
            self
        }
    }

    #[async_trait]
    impl NotionApi for FakeNotion {
        async fn fetch_page(&self, page_id: &str) -> Result<RecordMap, RemoteError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .lock()
                .expect("pages lock")
                .get(page_id)
                .cloned()
                .ok_or_else(|| RemoteError::Status {
                    endpoint: "loadPageChunk",
                    status: 404,
                    body: format!("no page {page_id}"),
                })
        }

        async fn fetch_users(
            &self,
            user_ids: &[String],
        ) -> Result<RecordTable<NotionUser>, RemoteError> {
            self.user_calls
                .lock()
                .expect("user calls lock")
                .push(user_ids.to_vec());
            if self.fail_users {
                return Err(RemoteError::transport("syncRecordValues", "connection reset"));
            }
            let users = self.users.lock().expect("users lock");
            Ok(user_ids
                .iter()
                .filter_map(|id| users.get(id))
                .map(|user| (user.id.clone(), Record::new(user.clone())))
                .collect())
        }
    }

    pub(crate) fn fetcher(api: FakeNotion) -> (NotionFetcher, Arc<FakeNotion>) {
        let api = Arc::new(api);
        let cache = Arc::new(NotionCache::new(&CacheConfig::default()));
        (NotionFetcher::new(api.clone(), cache), api)
    }

    #[tokio::test]
    async fn page_is_fetched_once_then_served_from_cache() {
        let (fetcher, api) = fetcher(FakeNotion::default().with_page("p", RecordMap::default()));

        fetcher.get_page_with_cache("p").await.expect("first fetch");
        fetcher.get_page_with_cache("p").await.expect("second fetch");

        assert_eq!(api.page_calls.load(Ordering::SeqCst), 1);
        assert!(fetcher.cache().get("page_p").is_some());
    }

    #[tokio::test]
    async fn failed_page_fetch_is_not_cached() {
        let (fetcher, api) = fetcher(FakeNotion::default());

        assert!(fetcher.get_page_with_cache("missing").await.is_err());
        assert!(fetcher.get_page_with_cache("missing").await.is_err());

        assert_eq!(api.page_calls.load(Ordering::SeqCst), 2);
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn users_are_deduplicated_and_batched() {
        let (fetcher, api) = fetcher(
            FakeNotion::default()
                .with_user("u1", "Ada")
                .with_user("u2", "Grace"),
        );

        let ids = vec!["u1".to_string(), "u2".to_string(), "u1".to_string()];
        let users = fetcher.get_users_with_cache(&ids).await;

        assert_eq!(users.len(), 2);
        assert_eq!(users["u1"].first_name.as_deref(), Some("Ada"));
        let calls = api.user_calls.lock().expect("calls").clone();
        assert_eq!(calls, vec![vec!["u1".to_string(), "u2".to_string()]]);
        assert!(fetcher.cache().get("user_u2").is_some());
    }

    #[tokio::test]
    async fn cached_users_skip_the_remote_call() {
        let (fetcher, api) = fetcher(FakeNotion::default().with_user("u1", "Ada"));
        let ids = vec!["u1".to_string()];

        fetcher.get_users_with_cache(&ids).await;
        let users = fetcher.get_users_with_cache(&ids).await;

        assert_eq!(users.len(), 1);
        assert_eq!(api.user_calls.lock().expect("calls").len(), 1);
    }

    #[tokio::test]
    async fn unknown_users_are_absent() {
        let (fetcher, _) = fetcher(FakeNotion::default().with_user("u1", "Ada"));
        let ids = vec!["u1".to_string(), "ghost".to_string()];

        let users = fetcher.get_users_with_cache(&ids).await;
        assert_eq!(users.keys().collect::<Vec<_>>(), vec!["u1"]);
    }

    #[tokio::test]
    async fn user_fetch_failure_returns_cached_users_only() {
        let (fetcher, _) = fetcher(FakeNotion {
            fail_users: true,
            ..FakeNotion::default()
        });
        fetcher.cache().set(
            "user_u1",
            CachedValue::User(User {
                id: "u1".into(),
                first_name: Some("Ada".into()),
                last_name: None,
                profile_photo: None,
            }),
        );

        let ids = vec!["u1".to_string(), "u2".to_string()];
        let users = fetcher.get_users_with_cache(&ids).await;

        assert_eq!(users.len(), 1);
        assert!(users.contains_key("u1"));
    }

    #[tokio::test]
    async fn empty_input_makes_no_call() {
        let (fetcher, api) = fetcher(FakeNotion::default());
        assert!(fetcher.get_users_with_cache(&[]).await.is_empty());
        assert!(api.user_calls.lock().expect("calls").is_empty());
    }
}
