//! Schema-driven decoding of page properties.

use serde_json::Value;
use thiserror::Error;

use crate::application::fetchers::NotionFetcher;
use crate::domain::post::{DateValue, PropertyMap, PropertyValue, User};
use crate::domain::record_map::{Block, PropertyKind, RecordTable, Schema};
use crate::domain::rich_text::{find_date_token, referenced_user_ids, text_content};

/// Why a single page could not be turned into a post.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("page {page_id}: date property `{name}` carries no date")]
    MissingDate { page_id: String, name: String },
    #[error("page {page_id}: date property `{name}` is malformed: {reason}")]
    MalformedDate {
        page_id: String,
        name: String,
        reason: String,
    },
    #[error("page {page_id}: start date `{value}` is not a valid date")]
    InvalidStartDate { page_id: String, value: String },
    #[error("page {page_id}: neither a start date nor a creation time is available")]
    MissingTimestamp { page_id: String },
}

/// Properties of one page decoded against its collection schema.
#[derive(Debug, Clone)]
pub struct DecodedPage {
    pub id: String,
    pub properties: PropertyMap,
}

#[derive(Clone)]
pub struct PropertyDecoder {
    fetcher: NotionFetcher,
}

impl PropertyDecoder {
    pub fn new(fetcher: NotionFetcher) -> Self {
        Self { fetcher }
    }

    /// Decode every raw property of `page_id` whose key the schema declares.
    ///
    /// Returns `Ok(None)` when the page block or the schema is absent.
    pub async fn decode_properties(
        &self,
        page_id: &str,
        blocks: &RecordTable<Block>,
        schema: Option<&Schema>,
    ) -> Result<Option<DecodedPage>, DecodeError> {
        let (Some(block), Some(schema)) = (
            blocks.get(page_id).and_then(|record| record.value.as_ref()),
            schema,
        ) else {
            return Ok(None);
        };

        let mut properties = PropertyMap::new();
        for (key, raw) in &block.properties {
            let Some(declared) = schema.get(key) else {
                continue;
            };
            let Some(kind) = declared.kind.as_ref() else {
                continue;
            };

            let value = match kind {
                PropertyKind::Date => {
                    PropertyValue::Date(decode_date(page_id, &declared.name, raw)?)
                }
                PropertyKind::Select | PropertyKind::MultiSelect => {
                    PropertyValue::Options(decode_options(raw))
                }
                PropertyKind::Person => PropertyValue::People(self.decode_people(raw).await),
                PropertyKind::Plain(_) => PropertyValue::Text(text_content(raw)),
            };
            properties.insert(declared.name.clone(), value);
        }

        Ok(Some(DecodedPage {
            id: page_id.to_string(),
            properties,
        }))
    }

    async fn decode_people(&self, raw: &Value) -> Vec<User> {
        let user_ids = referenced_user_ids(raw);
        if user_ids.is_empty() {
            return Vec::new();
        }
        self.fetcher
            .get_users_with_cache(&user_ids)
            .await
            .into_values()
            .collect()
    }
}

/// Split a select or multi-select value on commas.
pub fn decode_options(raw: &Value) -> Vec<String> {
    let text = text_content(raw);
    if text.is_empty() {
        return Vec::new();
    }
    text.split(',').map(str::to_string).collect()
}

/// Extract the date token of a date property, minus its `type` field.
pub fn decode_date(page_id: &str, name: &str, raw: &Value) -> Result<DateValue, DecodeError> {
    let token = find_date_token(raw).ok_or_else(|| DecodeError::MissingDate {
        page_id: page_id.to_string(),
        name: name.to_string(),
    })?;

    let mut date: DateValue =
        serde_json::from_value(token.clone()).map_err(|err| DecodeError::MalformedDate {
            page_id: page_id.to_string(),
            name: name.to_string(),
            reason: err.to_string(),
        })?;
    date.extra.remove("type");
    Ok(date)
}
