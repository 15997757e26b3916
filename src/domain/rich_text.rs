//! Readers for Notion's rich-text property encoding.
//!
//! A property value is a list of decorations, each `[text, [annotation, ...]]`.
//! Annotations are `[kind, payload]` pairs: `["d", {..}]` carries a date,
//! `["u", "<user id>"]` a person reference. Inline mentions carry a
//! placeholder glyph (`‣` or `⁍`) as their text.

use serde_json::Value;

/// Concatenate the text of every decoration, mention placeholders included.
///
/// A bare string is returned as is; anything else decodes to an empty string.
pub fn text_content(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(decorations) => decorations
            .iter()
            .filter_map(|decoration| match decoration {
                Value::Array(parts) => parts.first().and_then(Value::as_str),
                Value::String(text) => Some(text.as_str()),
                _ => None,
            })
            .collect(),
        _ => String::new(),
    }
}

/// Depth-first search for the first `["d", {..}]` date annotation.
pub fn find_date_token(value: &Value) -> Option<&Value> {
    let items = value.as_array()?;
    if items.first().and_then(Value::as_str) == Some("d") {
        return items.get(1);
    }
    items.iter().find_map(find_date_token)
}

/// Ids of users referenced by a person property, in order of appearance.
///
/// The decorations are flattened one level and every element shaped like
/// `[[kind, id], ...]` contributes its `id`. Entries without an id are skipped.
pub fn referenced_user_ids(value: &Value) -> Vec<String> {
    let Some(decorations) = value.as_array() else {
        return Vec::new();
    };

    decorations
        .iter()
        .flat_map(|decoration| match decoration {
            Value::Array(parts) => parts.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .filter_map(|element| {
            element
                .as_array()?
                .first()?
                .as_array()?
                .get(1)?
                .as_str()
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_content_joins_decorations() {
        let value = json!([["Hello, "], ["world", [["b"]]]]);
        assert_eq!(text_content(&value), "Hello, world");
    }

    #[test]
    fn text_content_keeps_mention_placeholders() {
        let value = json!([["See "], ["\u{2023}", [["p", "page-id"]]], ["!"]]);
        assert_eq!(text_content(&value), "See \u{2023}!");
    }

    #[test]
    fn text_content_of_odd_shapes() {
        assert_eq!(text_content(&json!("plain")), "plain");
        assert_eq!(text_content(&json!(null)), "");
        assert_eq!(text_content(&json!([])), "");
        assert_eq!(text_content(&json!(42)), "");
    }

    #[test]
    fn date_token_is_found_nested() {
        let value = json!([[
            "\u{2023}",
            [["d", { "type": "date", "start_date": "2024-03-01" }]]
        ]]);
        let token = find_date_token(&value).expect("date token");
        assert_eq!(token["start_date"], json!("2024-03-01"));
    }

    #[test]
    fn date_token_absent() {
        assert!(find_date_token(&json!([["just text"]])).is_none());
        assert!(find_date_token(&json!("d")).is_none());
    }

    #[test]
    fn user_ids_are_extracted_from_person_property() {
        let value = json!([
            ["\u{2023}", [["u", "user-1"]]],
            [","],
            ["\u{2023}", [["u", "user-2"]]]
        ]);
        assert_eq!(referenced_user_ids(&value), vec!["user-1", "user-2"]);
    }

    #[test]
    fn malformed_person_entries_are_ignored() {
        let value = json!([["\u{2023}", [["u"]]], ["\u{2023}", [["u", ""]]], ["\u{2023}"], 7]);
        assert!(referenced_user_ids(&value).is_empty());
        assert!(referenced_user_ids(&json!(null)).is_empty());
    }
}
