//! `mdimg resolve` – show the origin behind a CDN-wrapped URL.

use mdimg_core::url_model::{is_cdn_wrapper, resolve_original_url};

pub fn run_resolve(url: &str) {
    let resolved = resolve_original_url(url);
    if resolved == url && is_cdn_wrapper(url) {
        tracing::debug!("no embedded origin found in {}", url);
    }
    println!("{}", resolved);
}
