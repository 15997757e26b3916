//! Record-map shapes returned by the Notion API.
//!
//! Only the fields the post pipeline reads are typed. Everything else is kept
//! in `extra` so a record map can be handed on to a renderer untouched. Map
//! order follows the wire order, which matters: the first collection and the
//! first query entry of a database page are the ones that describe it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record table keyed by record id.
pub type RecordTable<T> = IndexMap<String, Record<T>>;

/// Schema of a collection: property key to declared type and display name.
pub type Schema = IndexMap<String, SchemaProperty>;

/// Query results of one collection: view id to view result.
pub type ViewIndex = IndexMap<String, ViewResult>;

/// Block types that mark a page as a database.
pub const DATABASE_BLOCK_TYPES: [&str; 2] = ["collection_view_page", "collection_view"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMap {
    #[serde(default)]
    pub block: RecordTable<Block>,
    #[serde(default)]
    pub collection: RecordTable<Collection>,
    #[serde(default)]
    pub collection_view: RecordTable<Value>,
    /// Collection id to view id to query result.
    #[serde(default)]
    pub collection_query: IndexMap<String, ViewIndex>,
    #[serde(default)]
    pub notion_user: RecordTable<NotionUser>,
}

impl RecordMap {
    pub fn block_value(&self, id: &str) -> Option<&Block> {
        self.block.get(id).and_then(|record| record.value.as_ref())
    }

    /// The collection backing this page, if the map carries one.
    pub fn first_collection(&self) -> Option<&Collection> {
        self.collection
            .values()
            .next()
            .and_then(|record| record.value.as_ref())
    }

    /// The view index of the first queried collection.
    pub fn first_view_index(&self) -> Option<&ViewIndex> {
        self.collection_query.values().next()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub value: Option<T>,
}

impl<T> Record<T> {
    pub fn new(value: T) -> Self {
        Self {
            role: None,
            value: Some(value),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Raw property values keyed by schema property key.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<BlockFormat>,
    /// Creation time in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub view_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn is_database(&self) -> bool {
        DATABASE_BLOCK_TYPES.contains(&self.kind.as_str())
    }

    pub fn full_width(&self) -> bool {
        self.format
            .as_ref()
            .and_then(|format| format.page_full_width)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_full_width: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub schema: Schema,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PropertyKind>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Declared type of a schema property, as far as decoding cares.
///
/// Every type without special handling (`title`, `text`, `url`, `number`,
/// `checkbox`, ...) decodes as plain text and keeps its wire name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyKind {
    Date,
    Select,
    MultiSelect,
    Person,
    Plain(String),
}

impl From<String> for PropertyKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "date" => Self::Date,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "person" => Self::Person,
            _ => Self::Plain(value),
        }
    }
}

impl From<PropertyKind> for String {
    fn from(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Date => "date".to_string(),
            PropertyKind::Select => "select".to_string(),
            PropertyKind::MultiSelect => "multi_select".to_string(),
            PropertyKind::Person => "person".to_string(),
            PropertyKind::Plain(other) => other,
        }
    }
}

/// Query result of a single collection view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewResult {
    #[serde(
        rename = "blockIds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub block_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_group_results: Option<GroupResults>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupResults {
    #[serde(rename = "blockIds", default)]
    pub block_ids: Vec<String>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotionUser {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_map_keeps_wire_order_and_unknown_fields() {
        let raw = json!({
            "block": {
                "root": { "role": "reader", "value": {
                    "id": "root",
                    "type": "collection_view_page",
                    "collection_id": "c1",
                    "view_ids": ["v1"],
                    "space_id": "s1"
                }}
            },
            "collection": {
                "c2": { "value": { "id": "c2", "schema": {} } },
                "c1": { "value": { "id": "c1", "schema": {
                    "title": { "name": "title", "type": "title" },
                    "xyz": { "name": "tags", "type": "multi_select", "options": [] }
                }}}
            }
        });

        let map: RecordMap = serde_json::from_value(raw).expect("record map");
        let root = map.block_value("root").expect("root block");
        assert!(root.is_database());
        assert_eq!(root.extra.get("space_id"), Some(&json!("s1")));

        let first = map.first_collection().expect("first collection");
        assert_eq!(first.id, "c2");

        let c1 = map.collection["c1"].value.as_ref().expect("c1");
        assert_eq!(
            c1.schema["title"].kind,
            Some(PropertyKind::Plain("title".to_string()))
        );
        assert_eq!(c1.schema["xyz"].kind, Some(PropertyKind::MultiSelect));

        let back = serde_json::to_value(&map).expect("serialize");
        assert_eq!(back["block"]["root"]["value"]["space_id"], json!("s1"));
        assert_eq!(
            back["collection"]["c1"]["value"]["schema"]["xyz"]["type"],
            json!("multi_select")
        );
    }

    #[test]
    fn missing_value_is_tolerated() {
        let map: RecordMap =
            serde_json::from_value(json!({ "block": { "gone": { "role": "none" } } }))
                .expect("record map");
        assert!(map.block_value("gone").is_none());
    }

    #[test]
    fn full_width_defaults_to_false() {
        let block = Block::default();
        assert!(!block.full_width());

        let block: Block = serde_json::from_value(json!({
            "id": "p",
            "type": "page",
            "format": { "page_full_width": true, "page_icon": "x" }
        }))
        .expect("block");
        assert!(block.full_width());
        assert!(!block.is_database());
    }
}
