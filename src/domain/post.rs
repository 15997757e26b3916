//! Decoded post model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record_map::NotionUser;

pub const TYPE_PROPERTY: &str = "type";
pub const TITLE_PROPERTY: &str = "title";
pub const SLUG_PROPERTY: &str = "slug";
pub const STATUS_PROPERTY: &str = "status";
pub const DATE_PROPERTY: &str = "date";

/// Names reserved for the synthetic fields of [`Post`].
const SYNTHETIC_FIELDS: [&str; 3] = ["id", "fullWidth", DATE_PROPERTY];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_photo: Option<String>,
}

impl From<NotionUser> for User {
    fn from(user: NotionUser) -> Self {
        Self {
            id: user.id,
            first_name: user.given_name,
            last_name: user.family_name,
            profile_photo: user.profile_photo,
        }
    }
}

/// A Notion date token without its `type` discriminator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Date(DateValue),
    Options(Vec<String>),
    People(Vec<User>),
}

impl PropertyValue {
    /// Whether the value carries any content at all.
    pub fn is_present(&self) -> bool {
        match self {
            PropertyValue::Text(text) => !text.is_empty(),
            PropertyValue::Date(_) => true,
            PropertyValue::Options(options) => !options.is_empty(),
            PropertyValue::People(people) => !people.is_empty(),
        }
    }
}

/// Decoded properties of one page, keyed by schema display name.
pub type PropertyMap = IndexMap<String, PropertyValue>;

/// A page of the blog database, decoded and ready to filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    #[serde(rename = "fullWidth")]
    pub full_width: bool,
    /// Publish time in Unix milliseconds.
    pub date: i64,
    #[serde(flatten)]
    pub properties: PropertyMap,
}

impl Post {
    /// Assemble a post, dropping decoded properties that would shadow the
    /// synthetic `id`, `fullWidth` and `date` fields.
    pub fn new(
        id: impl Into<String>,
        full_width: bool,
        date: i64,
        mut properties: PropertyMap,
    ) -> Self {
        properties.retain(|name, _| !SYNTHETIC_FIELDS.contains(&name.as_str()));
        Self {
            id: id.into(),
            full_width,
            date,
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.properties.get(name) {
            Some(PropertyValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// First option of a select-style property.
    pub fn first_option(&self, name: &str) -> Option<&str> {
        match self.properties.get(name) {
            Some(PropertyValue::Options(options)) => options.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.first_option(TYPE_PROPERTY)
    }

    pub fn status(&self) -> Option<&str> {
        self.first_option(STATUS_PROPERTY)
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.property(name).is_some_and(PropertyValue::is_present)
    }
}
