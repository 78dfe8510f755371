//! Reversing CDN image-fetch wrappers.
//!
//! Image proxies such as Substack's `substackcdn.com/image/fetch/...` or
//! Cloudinary's `/image/fetch/` embed the upstream URL inside their own path,
//! usually percent-encoded after a list of transformation options:
//!
//! `https://substackcdn.com/image/fetch/w_1456,c_limit/https%3A%2F%2Fbucket.s3.amazonaws.com%2Fa.png`
//!
//! Resolving the wrapper lets us fetch the original, which is often the
//! higher-quality file and avoids the proxy's rate limits.

use super::percent::percent_decode;

/// Path markers identifying a fetch-style CDN wrapper.
const WRAPPER_MARKERS: &[&str] = &["/image/fetch/"];

/// Transformation segments after which some wrappers place the upstream URL
/// without a scheme we can find by scanning.
const SPLIT_MARKERS: &[&str] = &[
    "/progressive:steep/",
    "/fl_progressive:steep/",
    "/q_auto:good,fl_progressive:steep/",
];

/// Scheme prefixes of an embedded URL and whether they are percent-encoded.
const EMBEDDED_PREFIXES: &[(&str, bool)] = &[
    ("http%3a%2f%2f", true),
    ("https%3a%2f%2f", true),
    ("http://", false),
    ("https://", false),
];

/// True when `url` looks like a CDN fetch wrapper.
pub fn is_cdn_wrapper(url: &str) -> bool {
    WRAPPER_MARKERS.iter().any(|m| url.contains(m))
}

/// Returns the upstream URL embedded in a CDN wrapper, or `url` unchanged.
///
/// Never fails: anything that does not look like a wrapper, or a wrapper we
/// cannot take apart, comes back as-is.
pub fn resolve_original_url(url: &str) -> String {
    if !is_cdn_wrapper(url) {
        return url.to_string();
    }

    if let Some(embedded) = scan_embedded_url(url) {
        return embedded;
    }

    for marker in SPLIT_MARKERS {
        if let Some((_, rest)) = url.split_once(marker) {
            if rest.is_empty() {
                continue;
            }
            return if rest.contains('%') {
                percent_decode(rest)
            } else {
                rest.to_string()
            };
        }
    }

    url.to_string()
}

/// Finds the earliest embedded `http(s)` URL after the wrapper's own scheme.
fn scan_embedded_url(url: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets, so positions map back onto `url`.
    let lowered = url.to_ascii_lowercase();
    let search_from = lowered.find("://").map(|i| i + 3).unwrap_or(0);
    let haystack = &lowered[search_from..];

    let (pos, encoded) = EMBEDDED_PREFIXES
        .iter()
        .filter_map(|(prefix, encoded)| haystack.find(prefix).map(|p| (p, *encoded)))
        .min_by_key(|(p, _)| *p)?;

    let embedded = &url[search_from + pos..];
    Some(if encoded {
        percent_decode(embedded)
    } else {
        embedded.to_string()
    })
}
