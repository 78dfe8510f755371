//! URL modeling and filename derivation.
//!
//! Resolves CDN-wrapped image URLs back to their origin and derives safe local
//! filenames from alt text or URL paths.

mod cdn;
mod path;
mod percent;
mod sanitize;

pub use cdn::{is_cdn_wrapper, resolve_original_url};
pub use path::{extension_from_url, filename_from_url_path, split_extension, url_path};
pub use percent::percent_decode;
pub use sanitize::sanitize_filename;

use sha2::{Digest, Sha256};

/// Extension used when the URL path does not carry one.
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Schemes that mark an image reference as remote.
const REMOTE_SCHEMES: &[&str] = &["http://", "https://", "ftp://"];

/// True when `url` has an http, https or ftp scheme (case-insensitive).
pub fn is_remote_url(url: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|scheme| {
        url.get(..scheme.len())
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Extension for the local copy of `url` (e.g. `".png"`), defaulting to `.jpg`.
pub fn image_extension(url: &str) -> String {
    extension_from_url(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Derives the base filename (no extension) for the local copy of an image.
///
/// Prefers the sanitized alt text. Without alt text, uses the URL's last path
/// segment (percent-decoded, extension stripped). When neither yields a name,
/// falls back to `image_<hash>` built from the URL so reruns pick the same name.
///
/// # Examples
///
/// - `derive_base_filename("Cat Photo", "https://x.com/1.png", ".png")` → `"Cat_Photo"`
/// - `derive_base_filename("", "https://x.com/a/sunset.jpg", ".jpg")` → `"sunset"`
pub fn derive_base_filename(alt_text: &str, url: &str, extension: &str) -> String {
    let from_alt = sanitize_filename(alt_text);
    if !from_alt.is_empty() {
        return from_alt;
    }

    let from_path = filename_from_url_path(url)
        .map(|segment| {
            let decoded = percent_decode(&segment);
            let stem = match split_extension(&decoded) {
                (stem, Some(ext)) if ext.eq_ignore_ascii_case(extension) => stem.to_string(),
                _ => decoded.clone(),
            };
            sanitize_filename(&stem)
        })
        .unwrap_or_default();

    if from_path.is_empty() || from_path == extension || is_only_dots(&from_path) {
        hashed_filename(url)
    } else {
        from_path
    }
}

/// `image_<first 8 hex digits of SHA-256(url)>`.
pub fn hashed_filename(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("image_{}", &hex::encode(digest)[..8])
}

fn is_only_dots(s: &str) -> bool {
    s.chars().all(|c| c == '.')
}
