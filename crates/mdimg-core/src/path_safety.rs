//! Platform path-length limits for downloaded image files.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conventional Windows `MAX_PATH`.
pub const WINDOWS_MAX_PATH: usize = 260;
/// Used when the OS cannot tell us its limit.
pub const FALLBACK_MAX_PATH: usize = 255;

/// Even a generated placeholder name does not fit under the directory.
#[derive(Debug, Error)]
#[error("path in {} exceeds the {limit}-byte limit even with a generated name", dir.display())]
pub struct PathTooLong {
    pub dir: PathBuf,
    pub limit: usize,
}

/// Base filename chosen for a download, and whether it was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeName {
    pub base: String,
    /// True when the candidate was too long and a UUID was substituted.
    pub substituted: bool,
}

/// Maximum path length for the current platform.
#[cfg(windows)]
pub fn max_path_len() -> usize {
    WINDOWS_MAX_PATH
}

/// Maximum path length for the current platform.
///
/// Asks `pathconf("/", _PC_PATH_MAX)`; falls back to 255 when unavailable.
#[cfg(unix)]
pub fn max_path_len() -> usize {
    let root = b"/\0";
    // SAFETY: `root` is a valid NUL-terminated C string.
    let r = unsafe { libc::pathconf(root.as_ptr() as *const libc::c_char, libc::_PC_PATH_MAX) };
    if r > 0 {
        r as usize
    } else {
        FALLBACK_MAX_PATH
    }
}

/// Maximum path length for the current platform.
#[cfg(not(any(unix, windows)))]
pub fn max_path_len() -> usize {
    FALLBACK_MAX_PATH
}

/// Length of `path` as the OS sees it.
pub fn path_len(path: &Path) -> usize {
    path.as_os_str().len()
}

/// True when `path` stays strictly below `limit`.
pub fn fits_within(path: &Path, limit: usize) -> bool {
    path_len(path) < limit
}

/// Returns a base filename whose full path `dir/base+ext` stays below
/// `limit`, substituting a random UUID when the candidate is too long.
pub fn safe_base_name(
    dir: &Path,
    base: &str,
    ext: &str,
    limit: usize,
) -> Result<SafeName, PathTooLong> {
    if fits_within(&dir.join(format!("{base}{ext}")), limit) {
        return Ok(SafeName {
            base: base.to_string(),
            substituted: false,
        });
    }

    let generated = uuid::Uuid::new_v4().to_string();
    if !fits_within(&dir.join(format!("{generated}{ext}")), limit) {
        return Err(PathTooLong {
            dir: dir.to_path_buf(),
            limit,
        });
    }
    tracing::debug!(
        candidate = base,
        replacement = %generated,
        "filename too long, using generated name"
    );
    Ok(SafeName {
        base: generated,
        substituted: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_limit_is_positive() {
        assert!(max_path_len() >= FALLBACK_MAX_PATH.min(WINDOWS_MAX_PATH));
    }

    #[test]
    fn short_name_unchanged() {
        let r = safe_base_name(Path::new("doc-images"), "Cat_Photo", ".png", 255).unwrap();
        assert_eq!(
            r,
            SafeName {
                base: "Cat_Photo".to_string(),
                substituted: false
            }
        );
    }

    #[test]
    fn long_name_replaced_with_uuid() {
        let dir = Path::new("doc-images");
        let base = "x".repeat(300);
        let r = safe_base_name(dir, &base, ".png", 255).unwrap();
        assert!(r.substituted);
        assert!(uuid::Uuid::parse_str(&r.base).is_ok());
        assert!(fits_within(&dir.join(format!("{}.png", r.base)), 255));
    }

    #[test]
    fn limit_is_exclusive() {
        let dir = Path::new("d");
        // "d/" + base + ".png" == 20 bytes exactly
        let base = "a".repeat(14);
        assert!(safe_base_name(dir, &base, ".png", 20).is_err());
        let r = safe_base_name(dir, &base, ".png", 21).unwrap();
        assert!(!r.substituted);

        // At the limit with room for a UUID: substituted.
        let base = "a".repeat(56);
        let r = safe_base_name(dir, &base, ".png", 62).unwrap();
        assert!(r.substituted);
    }

    #[test]
    fn directory_too_long_for_any_name() {
        let dir = PathBuf::from("d".repeat(250));
        let err = safe_base_name(&dir, "cat", ".png", 255).unwrap_err();
        assert_eq!(err.limit, 255);
    }

    #[test]
    fn never_returns_path_at_or_over_limit() {
        let dir = Path::new("some/output-images");
        for len in [1usize, 10, 50, 100, 200, 230, 240, 260, 400] {
            let base = "b".repeat(len);
            if let Ok(r) = safe_base_name(dir, &base, ".jpeg", 100) {
                assert!(path_len(&dir.join(format!("{}.jpeg", r.base))) < 100);
            }
        }
    }
}
