//! Embedded PNG thumbnails
//!
//! Slicers write thumbnails as base64 wrapped in comment lines:
//!
//! ```text
//! ; thumbnail begin 300x300 12345
//! ; iVBORw0KGgoAAAANSUhEUgAAASwAAAEsCAYAAAB5fY51AAAACXBIWXMAAAsTAAALEwEAmpwYAAAgAElEQVR4
//! ; ...
//! ; thumbnail end
//! ```
//!
//! The firmware wants one data URI instead.

use std::sync::OnceLock;

use regex::Regex;
use smfix_core::Sequence;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

fn thumbnail_regex() -> &'static Regex {
    static THUMBNAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    THUMBNAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"(?m)(?:^; thumbnail begin \d+[x ]\d+ \d+)(?:\n|\r\n?)((?:.+(?:\n|\r\n?))+?)(?:^; thumbnail end)",
        )
        .expect("invalid regex pattern")
    })
}

/// Data URI of the last thumbnail in a block of comment text
pub fn thumbnail_from_comments(comments: &str) -> Option<String> {
    let caps = thumbnail_regex().captures_iter(comments).last()?;
    let data = caps
        .get(1)?
        .as_str()
        .replace("\r\n", "")
        .replace('\n', "")
        .replace("; ", "");
    Some(format!("{}{}", DATA_URI_PREFIX, data))
}

/// Data URI of the last thumbnail in the sequence's comment lines
pub fn extract_thumbnail(sequence: &Sequence) -> Option<String> {
    let mut comments = String::with_capacity(64 * 1024);
    for block in sequence.iter().filter(|b| b.is_comment()) {
        comments.push_str(block.comment());
        comments.push('\n');
    }
    let thumbnail = thumbnail_from_comments(&comments);
    if let Some(uri) = &thumbnail {
        tracing::debug!("Found thumbnail, {} bytes", uri.len());
    }
    thumbnail
}
