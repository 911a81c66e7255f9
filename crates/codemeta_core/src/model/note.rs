//! Note model and plain-text projection.
//!
//! # Responsibility
//! - Define the persisted note shape keyed by `(project_id, file_path)`.
//! - Derive the plain-text projection that decides note emptiness.
//!
//! # Invariants
//! - A note whose plain text is empty is treated as no note at all.

use crate::model::path::CanonicalPath;
use crate::model::project::ProjectId;
use once_cell::sync::Lazy;
use regex::Regex;

static HTML_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(head|style|script)\b[^>]*>.*?</(head|style|script)>")
        .expect("valid block regex")
});
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Persisted note row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub project_id: ProjectId,
    pub file_path: CanonicalPath,
    /// Editor output, stored verbatim.
    pub content: String,
    /// Derived text used for the empty-note rule.
    pub plain_text: String,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

impl NoteRecord {
    /// Returns whether this note counts for classification.
    pub fn is_empty(&self) -> bool {
        self.plain_text.is_empty()
    }
}

/// Extracts trimmed plain text from editor content.
///
/// Rules:
/// - `<head>`, `<style>` and `<script>` blocks are dropped with their body.
/// - Remaining tags are replaced by a space.
/// - `&nbsp;`, `&lt;`, `&gt;`, `&quot;`, `&#39;` and `&amp;` are decoded.
/// - Whitespace runs collapse to one space and the result is trimmed.
pub fn extract_plain_text(content: &str) -> String {
    let without_blocks = HTML_BLOCK_RE.replace_all(content, " ");
    let without_tags = HTML_TAG_RE.replace_all(&without_blocks, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::extract_plain_text;

    #[test]
    fn plain_input_is_trimmed() {
        assert_eq!(extract_plain_text("  hello \n world  "), "hello world");
    }

    #[test]
    fn rich_text_markup_without_text_is_empty() {
        let rich = "<!DOCTYPE HTML><html><head><style>p { margin: 0 }</style></head>\
                    <body><p>&nbsp;</p><p><br /></p></body></html>";
        assert_eq!(extract_plain_text(rich), "");
    }

    #[test]
    fn rich_text_keeps_visible_text() {
        let rich = "<html><body><p>check <b>this</b> &amp; that</p></body></html>";
        assert_eq!(extract_plain_text(rich), "check this & that");
    }
}
