//! Filename and extension extraction from URL paths.

/// Longest extension (without the dot) accepted from a URL.
const MAX_EXTENSION_LEN: usize = 10;

/// Returns the path component of `url`.
///
/// Uses a real URL parser when possible. Markdown authors sometimes write
/// URLs the parser rejects (raw spaces, stray brackets), so those fall back to
/// cutting off the scheme/authority and any query or fragment by hand.
pub fn url_path(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        return parsed.path().to_string();
    }
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => url,
    };
    let rest = rest.split(['?', '#']).next().unwrap_or("");
    match rest.find('/') {
        Some(i) => rest[i..].to_string(),
        None => String::new(),
    }
}

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// Returns `None` if the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let path = url_path(url);
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Splits a filename into stem and extension (with leading dot).
///
/// Leading dots do not start an extension (`.hidden` has none), matching the
/// usual `splitext` rules.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    let trimmed = name.trim_start_matches('.');
    let offset = name.len() - trimmed.len();
    match trimmed.rfind('.') {
        Some(i) => (&name[..offset + i], Some(&name[offset + i..])),
        None => (name, None),
    }
}

/// Returns the extension of the URL's last path segment (e.g. `".png"`).
///
/// Only short alphanumeric extensions are accepted; anything else (`"."`,
/// `".php%3Fid"`, ...) is treated as missing.
pub fn extension_from_url(url: &str) -> Option<String> {
    let segment = filename_from_url_path(url)?;
    let (_, ext) = split_extension(&segment);
    let ext = ext?;
    let body = &ext[1..];
    if body.is_empty()
        || body.len() > MAX_EXTENSION_LEN
        || !body.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_string())
}
