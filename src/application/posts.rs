//! Assembly of the published post list from the blog database.

use std::sync::Arc;
use std::time::Instant;

use chrono_tz::Tz;
use futures::future::join_all;
use metrics::histogram;
use tracing::{debug, info, warn};

use crate::application::fetchers::NotionFetcher;
use crate::application::filter::filter_published;
use crate::application::page_ids::collect_page_ids;
use crate::application::properties::{DecodeError, DecodedPage, PropertyDecoder};
use crate::application::remote::RemoteError;
use crate::cache::Clock;
use crate::domain::ids::id_to_uuid;
use crate::domain::post::{DATE_PROPERTY, Post, PropertyValue};
use crate::domain::record_map::{Block, RecordMap, RecordTable, Schema};
use crate::util::timezone::{local_date_to_unix_ms, parse_zone};

/// Histogram of the time spent decoding the database pages, in milliseconds.
pub const ASSEMBLE_MS: &str = "quire_posts_assemble_ms";

/// Blog-level knobs that shape the post list.
#[derive(Debug, Clone)]
pub struct BlogOptions {
    /// Id of the Notion database page holding the posts.
    pub root_page_id: String,
    /// Restrict enumeration to a single view of the database.
    pub view_id: Option<String>,
    pub sort_by_date: bool,
    /// Zone used to interpret calendar dates without their own zone.
    pub timezone: Tz,
}

#[derive(Clone)]
pub struct PostService {
    fetcher: NotionFetcher,
    decoder: PropertyDecoder,
    options: BlogOptions,
    clock: Arc<dyn Clock>,
}

impl PostService {
    pub fn new(fetcher: NotionFetcher, options: BlogOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            decoder: PropertyDecoder::new(fetcher.clone()),
            fetcher,
            options,
            clock,
        }
    }

    pub fn options(&self) -> &BlogOptions {
        &self.options
    }

    /// Every published post of the blog database, newest first when
    /// `sort_by_date` is set.
    ///
    /// `None` means the list is unavailable: the root page could not be
    /// fetched or is not a database. `Some(vec![])` means nothing is published.
    pub async fn get_all_posts(&self, include_pages: bool) -> Option<Vec<Post>> {
        let Some(root_id) = id_to_uuid(&self.options.root_page_id) else {
            warn!(
                root_page_id = %self.options.root_page_id,
                "configured root page id is not a Notion id"
            );
            return None;
        };

        let started = Instant::now();
        let record_map = match self.fetcher.get_page_with_cache(&root_id).await {
            Ok(record_map) => record_map,
            Err(err) => {
                warn!(root_id, error = %err, "failed to fetch blog database");
                return None;
            }
        };
        debug!(
            root_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched blog database"
        );

        let is_database = record_map
            .block_value(&root_id)
            .is_some_and(Block::is_database);
        if !is_database {
            info!(root_id, "root page is not a database");
            return None;
        }

        let schema = record_map.first_collection().map(|collection| &collection.schema);
        let page_ids = collect_page_ids(
            record_map.first_view_index(),
            self.options.view_id.as_deref(),
        );

        let decode_started = Instant::now();
        let results = join_all(
            page_ids
                .iter()
                .map(|page_id| self.process_page(page_id, &record_map.block, schema)),
        )
        .await;

        let mut candidates = Vec::with_capacity(results.len());
        let mut failures = 0usize;
        for result in results {
            match result {
                Ok(Some(post)) => candidates.push(post),
                Ok(None) => {}
                Err(err) => {
                    failures += 1;
                    warn!(error = %err, "skipping page that failed to decode");
                }
            }
        }

        let decode_ms = decode_started.elapsed().as_secs_f64() * 1000.0;
        histogram!(ASSEMBLE_MS).record(decode_ms);
        debug!(
            candidates = candidates.len(),
            failures,
            elapsed_ms = decode_ms as u64,
            "decoded database pages"
        );

        let mut posts = filter_published(&candidates, include_pages, self.clock.now_ms());
        if self.options.sort_by_date {
            posts.sort_by(|a, b| b.date.cmp(&a.date));
        }
        Some(posts)
    }

    async fn process_page(
        &self,
        page_id: &str,
        blocks: &RecordTable<Block>,
        schema: Option<&Schema>,
    ) -> Result<Option<Post>, DecodeError> {
        let Some(DecodedPage { id, properties }) = self
            .decoder
            .decode_properties(page_id, blocks, schema)
            .await?
        else {
            debug!(page_id, "page block or schema missing; skipping");
            return Ok(None);
        };

        let block = blocks.get(page_id).and_then(|record| record.value.as_ref());
        let full_width = block.is_some_and(Block::full_width);
        let date = resolve_date(
            page_id,
            properties.get(DATE_PROPERTY),
            block.and_then(|block| block.created_time),
            self.options.timezone,
        )?;

        Ok(Some(Post::new(id, full_width, date, properties)))
    }

    /// Full record map of one post, for the renderer.
    pub async fn get_post_blocks(&self, page_id: &str) -> Result<Arc<RecordMap>, RemoteError> {
        let id = id_to_uuid(page_id).unwrap_or_else(|| page_id.to_string());
        let started = Instant::now();
        let result = self.fetcher.get_page_with_cache(&id).await;
        match &result {
            Ok(_) => debug!(
                page_id = %id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "loaded post blocks"
            ),
            Err(err) => warn!(page_id = %id, error = %err, "failed to load post blocks"),
        }
        result
    }
}

/// Publish time of a page in Unix milliseconds.
///
/// The `date` property's start date wins, read in its own zone when it has one
/// and in `default_zone` otherwise. Without a start date the block creation
/// time is used.
pub fn resolve_date(
    page_id: &str,
    date_property: Option<&PropertyValue>,
    created_time: Option<i64>,
    default_zone: Tz,
) -> Result<i64, DecodeError> {
    let start = match date_property {
        Some(PropertyValue::Date(date)) => date
            .start_date
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|start_date| (start_date, date)),
        _ => None,
    };

    if let Some((start_date, date)) = start {
        let zone = date
            .time_zone
            .as_deref()
            .and_then(parse_zone)
            .unwrap_or(default_zone);
        return local_date_to_unix_ms(start_date, date.start_time.as_deref(), zone).ok_or_else(
            || DecodeError::InvalidStartDate {
                page_id: page_id.to_string(),
                value: start_date.to_string(),
            },
        );
    }

    created_time.ok_or_else(|| DecodeError::MissingTimestamp {
        page_id: page_id.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::fetchers::tests::{FakeNotion, fetcher};
    use crate::cache::ManualClock;
    use crate::domain::post::DateValue;

    pub(crate) const ROOT: &str = "11111111-1111-4111-8111-111111111111";
    pub(crate) const NOW: i64 = 1_717_200_000_000;

    pub(crate) fn service(api: FakeNotion, sort_by_date: bool) -> PostService {
        let (fetcher, _) = fetcher(api);
        PostService::new(
            fetcher,
            BlogOptions {
                root_page_id: ROOT.replace('-', ""),
                view_id: None,
                sort_by_date,
                timezone: Tz::UTC,
            },
            Arc::new(ManualClock::new(NOW)),
        )
    }

    pub(crate) fn page(
        id: &str,
        title: &str,
        status: &str,
        start_date: Option<&str>,
        created: i64,
    ) -> serde_json::Value {
        let mut properties = json!({
            "title": [[title]],
            "slug": [[title.to_lowercase()]],
            "type": [["Post"]],
            "status": [[status]]
        });
        if let Some(start) = start_date {
            properties["date"] =
                json!([["\u{2023}", [["d", { "type": "date", "start_date": start }]]]]);
        }
        json!({ "value": {
            "id": id,
            "type": "page",
            "properties": properties,
            "created_time": created
        }})
    }

    pub(crate) fn database(pages: &[(&str, serde_json::Value)]) -> RecordMap {
        let mut block = serde_json::Map::new();
        block.insert(
            ROOT.to_string(),
            json!({ "value": { "id": ROOT, "type": "collection_view_page", "collection_id": "c1" } }),
        );
        for (id, value) in pages {
            block.insert(id.to_string(), value.clone());
        }
        let ids: Vec<&str> = pages.iter().map(|(id, _)| *id).collect();

        serde_json::from_value(json!({
            "block": block,
            "collection": { "c1": { "value": { "id": "c1", "schema": {
                "title": { "name": "title", "type": "title" },
                "slug": { "name": "slug", "type": "text" },
                "type": { "name": "type", "type": "select" },
                "status": { "name": "status", "type": "select" },
                "date": { "name": "date", "type": "date" }
            }}}},
            "collection_query": { "c1": {
                "v1": { "collection_group_results": { "blockIds": ids } }
            }}
        }))
        .expect("database record map")
    }

    #[tokio::test]
    async fn published_posts_are_sorted_newest_first() {
        let map = database(&[
            ("a", page("a", "Older", "Published", Some("2024-01-01"), 0)),
            ("b", page("b", "Draft", "Draft", Some("2024-02-01"), 0)),
            ("c", page("c", "Newer", "Published", None, NOW - 1_000)),
        ]);
        let service = service(FakeNotion::default().with_page(ROOT, map), true);

        let posts = service.get_all_posts(false).await.expect("posts");
        let ids: Vec<&str> = posts.iter().map(|post| post.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(posts[1].date, 1_704_067_200_000);
        assert_eq!(posts[0].date, NOW - 1_000);
    }

    #[tokio::test]
    async fn enumeration_order_is_kept_without_sorting() {
        let map = database(&[
            ("a", page("a", "First", "Published", Some("2023-01-01"), 0)),
            ("b", page("b", "Second", "Published", Some("2024-01-01"), 0)),
        ]);
        let service = service(FakeNotion::default().with_page(ROOT, map), false);

        let posts = service.get_all_posts(false).await.expect("posts");
        assert_eq!(posts[0].id, "a");
        assert_eq!(posts[1].id, "b");
    }

    #[tokio::test]
    async fn equal_dates_keep_enumeration_order() {
        let map = database(&[
            ("a", page("a", "One", "Published", Some("2024-01-01"), 0)),
            ("b", page("b", "Two", "Published", Some("2024-01-01"), 0)),
            ("c", page("c", "Three", "Published", Some("2024-01-01"), 0)),
        ]);
        let service = service(FakeNotion::default().with_page(ROOT, map), true);

        let posts = service.get_all_posts(false).await.expect("posts");
        let ids: Vec<&str> = posts.iter().map(|post| post.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn broken_page_is_skipped_not_fatal() {
        let mut broken = page("b", "Broken", "Published", None, 0);
        broken["value"]["properties"]["date"] = json!([["no date token"]]);
        let map = database(&[
            ("a", page("a", "Fine", "Published", Some("2024-01-01"), 0)),
            ("b", broken),
        ]);
        let service = service(FakeNotion::default().with_page(ROOT, map), true);

        let posts = service.get_all_posts(false).await.expect("posts");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "a");
    }

    #[tokio::test]
    async fn non_database_root_yields_none() {
        let map: RecordMap = serde_json::from_value(json!({
            "block": { ROOT: { "value": { "id": ROOT, "type": "page" } } }
        }))
        .expect("record map");
        let service = service(FakeNotion::default().with_page(ROOT, map), true);

        assert!(service.get_all_posts(false).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_root_yields_none() {
        let service = service(FakeNotion::default(), true);
        assert!(service.get_all_posts(false).await.is_none());
    }

    #[tokio::test]
    async fn empty_database_yields_empty_list() {
        let service = service(FakeNotion::default().with_page(ROOT, database(&[])), true);
        assert_eq!(service.get_all_posts(false).await, Some(vec![]));
    }

    #[tokio::test]
    async fn post_blocks_go_through_the_page_cache() {
        let service = service(
            FakeNotion::default().with_page(ROOT, RecordMap::default()),
            true,
        );
        service
            .get_post_blocks(&ROOT.replace('-', ""))
            .await
            .expect("blocks");
        assert!(service.fetcher.cache().get(&format!("page_{ROOT}")).is_some());
    }

    #[test]
    fn start_date_wins_over_creation_time() {
        let date = PropertyValue::Date(DateValue {
            start_date: Some("2024-01-01".into()),
            ..DateValue::default()
        });
        assert_eq!(
            resolve_date("p", Some(&date), Some(42), Tz::UTC).expect("date"),
            1_704_067_200_000
        );
    }

    #[test]
    fn creation_time_is_the_fallback() {
        assert_eq!(resolve_date("p", None, Some(42), Tz::UTC).expect("date"), 42);
    }

    #[test]
    fn date_own_zone_beats_default_zone() {
        let date = PropertyValue::Date(DateValue {
            start_date: Some("2024-01-01".into()),
            time_zone: Some("Asia/Shanghai".into()),
            ..DateValue::default()
        });
        assert_eq!(
            resolve_date("p", Some(&date), None, Tz::UTC).expect("date"),
            1_704_067_200_000 - 8 * 3_600_000
        );
    }

    #[test]
    fn start_time_in_a_dst_gap_still_dates_the_post() {
        let date = PropertyValue::Date(DateValue {
            start_date: Some("2024-03-31".into()),
            start_time: Some("02:30".into()),
            time_zone: Some("Europe/Berlin".into()),
            ..DateValue::default()
        });
        assert_eq!(
            resolve_date("p", Some(&date), Some(42), Tz::UTC).expect("date"),
            1_711_848_600_000
        );
    }

    #[test]
    fn no_timestamp_at_all_is_an_error() {
        let err = resolve_date("p", None, None, Tz::UTC).expect_err("no timestamp");
        assert!(matches!(err, DecodeError::MissingTimestamp { .. }));
    }
}
