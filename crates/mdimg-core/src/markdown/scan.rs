//! Image reference extraction.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::url_model::is_remote_url;

/// `![alt](url)` on one line; both groups non-greedy.
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("invalid image regex"));

/// One `![alt](url)` occurrence in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt_text: String,
    /// Target with surrounding whitespace trimmed.
    pub url: String,
    /// The full matched text, `![...](...)`.
    pub raw: String,
    /// Byte range of `raw` in the scanned document.
    pub span: Range<usize>,
}

impl ImageRef {
    pub fn is_remote(&self) -> bool {
        is_remote_url(&self.url)
    }
}

/// All image references in `document`, in order of appearance.
pub fn scan(document: &str) -> Vec<ImageRef> {
    IMAGE_RE
        .captures_iter(document)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(ImageRef {
                alt_text: caps.get(1).map_or("", |m| m.as_str()).to_string(),
                url: caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
                raw: whole.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}
