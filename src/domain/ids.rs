//! Notion id normalization.
//!
//! Notion hands out the same id in two spellings: a bare 32-hex string (as
//! seen in share links, optionally prefixed by a title slug) and the dashed
//! UUID form used as record-map keys. Everything internal uses the dashed form.

use uuid::Uuid;

/// Normalize a Notion id to lowercase dashed UUID form.
///
/// Accepts a dashed UUID, a bare 32-hex id, or a slugged link segment such as
/// `My-Post-0123456789abcdef0123456789abcdef`. Returns `None` for anything else.
pub fn id_to_uuid(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(id) = parse_compact(trimmed) {
        return Some(id);
    }

    trimmed.rsplit_once('-').and_then(|(_, tail)| parse_compact(tail))
}

fn parse_compact(candidate: &str) -> Option<String> {
    let compact: String = candidate.chars().filter(|c| *c != '-').collect();
    if compact.len() != 32 || !compact.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Uuid::parse_str(&compact)
        .ok()
        .map(|uuid| uuid.hyphenated().to_string())
}
