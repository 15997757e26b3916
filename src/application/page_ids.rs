//! Enumeration of candidate page ids from a collection's view index.

use indexmap::IndexSet;
use tracing::warn;

use crate::domain::ids::id_to_uuid;
use crate::domain::record_map::ViewIndex;

/// Page ids listed by the view index.
///
/// With a `view_id`, only that view's ids are returned, in view order; the id
/// may be given in compact or dashed form. Without one, the grouped results of
/// every view are merged: each id appears once, at the position where it was
/// first seen, walking views in index order.
///
/// An unknown or malformed view id, or a view without ids, yields an empty
/// list.
pub fn collect_page_ids(views: Option<&ViewIndex>, view_id: Option<&str>) -> Vec<String> {
    let Some(views) = views.filter(|views| !views.is_empty()) else {
        warn!("collection query has no views");
        return Vec::new();
    };

    match view_id {
        Some(view_id) => page_ids_for_view(views, view_id),
        None => page_ids_across_views(views),
    }
}

fn page_ids_for_view(views: &ViewIndex, view_id: &str) -> Vec<String> {
    let Some(uuid) = id_to_uuid(view_id) else {
        warn!(view_id, "invalid view id");
        return Vec::new();
    };

    let Some(view) = views.get(&uuid) else {
        warn!(view_id, "view not found in collection query");
        return Vec::new();
    };

    match (&view.block_ids, &view.collection_group_results) {
        (Some(ids), _) => ids.clone(),
        (None, Some(grouped)) => grouped.block_ids.clone(),
        (None, None) => {
            warn!(view_id, "view has no block ids");
            Vec::new()
        }
    }
}

fn page_ids_across_views(views: &ViewIndex) -> Vec<String> {
    let ordered: IndexSet<&str> = views
        .values()
        .filter_map(|view| view.collection_group_results.as_ref())
        .flat_map(|grouped| grouped.block_ids.iter().map(String::as_str))
        .collect();
    ordered.into_iter().map(str::to_string).collect()
}
