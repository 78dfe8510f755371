//! Local file names for downloaded images, and reuse of files already on disk.

use std::fs;
use std::path::Path;

use crate::path_safety;
use crate::probe::{probe_file, Dimensions};

/// `<base>_<W>x<H><ext>`.
pub fn dimensioned_file_name(base: &str, dimensions: Dimensions, ext: &str) -> String {
    format!("{}_{}{}", base, dimensions, ext)
}

/// Name to save a fresh download under: dimensioned when the size is known
/// and the path stays below `limit`, plain `<base><ext>` otherwise.
pub fn final_file_name(
    dir: &Path,
    base: &str,
    dimensions: Dimensions,
    ext: &str,
    limit: usize,
) -> String {
    let plain = format!("{}{}", base, ext);
    if !dimensions.is_known() {
        return plain;
    }
    let named = dimensioned_file_name(base, dimensions, ext);
    if path_safety::fits_within(&dir.join(&named), limit) {
        named
    } else {
        tracing::info!(
            "path with dimensions too long, keeping {} instead of {}",
            plain,
            named
        );
        plain
    }
}

/// A file for this image that is already in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingImage {
    pub file_name: String,
    /// `0x0` when the file could not be probed.
    pub dimensions: Dimensions,
}

/// Looks for an earlier copy of `<base><ext>` in `dir`.
///
/// A dimensioned `<base>_<W>x<H><ext>` is reused only when its pixels match
/// the suffix and `<base>_<W>x<H>` is not a base name of its own (per
/// `is_claimed`), so an undimensioned save of another image is never taken
/// for this one. An undimensioned `<base><ext>` is probed and renamed to its
/// dimensioned name; when it cannot be probed, or the dimensioned path would
/// not stay below `limit`, it is returned under its current name.
pub fn find_existing(
    dir: &Path,
    base: &str,
    ext: &str,
    limit: usize,
    is_claimed: impl Fn(&str) -> bool,
) -> Option<ExistingImage> {
    if let Some(found) = find_dimensioned(dir, base, ext, is_claimed) {
        return Some(found);
    }

    let plain = format!("{}{}", base, ext);
    let plain_path = dir.join(&plain);
    if !plain_path.is_file() {
        return None;
    }

    let dimensions = match probe_file(&plain_path) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("cannot read existing image, referencing as is: {:#}", e);
            Dimensions::UNKNOWN
        }
    };
    if !dimensions.is_known() {
        return Some(ExistingImage {
            file_name: plain,
            dimensions,
        });
    }

    let named = dimensioned_file_name(base, dimensions, ext);
    let named_path = dir.join(&named);
    if !path_safety::fits_within(&named_path, limit) {
        return Some(ExistingImage {
            file_name: plain,
            dimensions,
        });
    }
    if named_path != plain_path && !named_path.exists() {
        if let Err(e) = fs::rename(&plain_path, &named_path) {
            tracing::warn!(
                "could not rename {} to {}: {}",
                plain_path.display(),
                named_path.display(),
                e
            );
            return Some(ExistingImage {
                file_name: plain,
                dimensions,
            });
        }
        tracing::debug!("renamed existing {} to {}", plain, named);
    }
    Some(ExistingImage {
        file_name: named,
        dimensions,
    })
}

/// Finds a verified `<base>_<W>x<H><ext>` in `dir`. With several matches,
/// the lexicographically first name wins so reruns are stable.
fn find_dimensioned(
    dir: &Path,
    base: &str,
    ext: &str,
    is_claimed: impl Fn(&str) -> bool,
) -> Option<ExistingImage> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("cannot list {}: {}", dir.display(), e);
            return None;
        }
    };
    let mut matches: Vec<(String, Dimensions)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| parse_dimensioned(&name, base, ext).map(|d| (name, d)))
        .filter(|(name, _)| !is_claimed(&name[..name.len() - ext.len()]))
        .collect();
    matches.sort_by(|a, b| a.0.cmp(&b.0));
    matches
        .into_iter()
        .find(|(name, dimensions)| match probe_file(&dir.join(name)) {
            Ok(actual) if actual == *dimensions => true,
            Ok(actual) => {
                tracing::debug!("{} is {} on disk, not reusing", name, actual);
                false
            }
            Err(e) => {
                tracing::debug!("not reusing {}: {:#}", name, e);
                false
            }
        })
        .map(|(file_name, dimensions)| ExistingImage {
            file_name,
            dimensions,
        })
}

/// Dimensions encoded in `name` if it is `<base>_<W>x<H><ext>`.
fn parse_dimensioned(name: &str, base: &str, ext: &str) -> Option<Dimensions> {
    let rest = name.strip_prefix(base)?.strip_prefix('_')?;
    let size = rest.strip_suffix(ext)?;
    let (w, h) = size.split_once('x')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(w) || !digits(h) {
        return None;
    }
    Some(Dimensions::new(w.parse().ok()?, h.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::tests::png_bytes;

    const ROOMY: usize = 4096;

    fn unclaimed(_: &str) -> bool {
        false
    }

    #[test]
    fn dimensioned_name_format() {
        assert_eq!(
            dimensioned_file_name("Cat_Photo", Dimensions::new(400, 300), ".png"),
            "Cat_Photo_400x300.png"
        );
    }

    #[test]
    fn final_name_depends_on_dimensions() {
        let dir = Path::new("doc-images");
        assert_eq!(
            final_file_name(dir, "cat", Dimensions::new(2, 3), ".png", ROOMY),
            "cat_2x3.png"
        );
        assert_eq!(
            final_file_name(dir, "cat", Dimensions::UNKNOWN, ".png", ROOMY),
            "cat.png"
        );
    }

    #[test]
    fn final_name_drops_dimensions_when_too_long() {
        let dir = Path::new("doc-images");
        // "doc-images/cat.png" is 18 bytes, "doc-images/cat_1200x800.png" is 27.
        assert_eq!(
            final_file_name(dir, "cat", Dimensions::new(1200, 800), ".png", 20),
            "cat.png"
        );
        assert_eq!(
            final_file_name(dir, "cat", Dimensions::new(1200, 800), ".png", 28),
            "cat_1200x800.png"
        );
    }

    #[test]
    fn parse_only_exact_pattern() {
        assert_eq!(
            parse_dimensioned("cat_4x5.png", "cat", ".png"),
            Some(Dimensions::new(4, 5))
        );
        assert_eq!(parse_dimensioned("cat.png", "cat", ".png"), None);
        assert_eq!(parse_dimensioned("cat_4x5.jpg", "cat", ".png"), None);
        assert_eq!(parse_dimensioned("cat_big_4x5.png", "cat", ".png"), None);
        assert_eq!(parse_dimensioned("cat_x5.png", "cat", ".png"), None);
        assert_eq!(parse_dimensioned("cat_4x.png", "cat", ".png"), None);
        assert_eq!(parse_dimensioned("dog_4x5.png", "cat", ".png"), None);
    }

    #[test]
    fn nothing_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_existing(dir.path(), "cat", ".png", ROOMY, unclaimed), None);
    }

    #[test]
    fn finds_dimensioned_copy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat_4x5.png"), png_bytes(4, 5)).unwrap();
        fs::write(dir.path().join("cat_big_9x9.png"), png_bytes(9, 9)).unwrap();
        assert_eq!(
            find_existing(dir.path(), "cat", ".png", ROOMY, unclaimed),
            Some(ExistingImage {
                file_name: "cat_4x5.png".to_string(),
                dimensions: Dimensions::new(4, 5),
            })
        );
    }

    #[test]
    fn renames_undimensioned_copy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat.png"), png_bytes(6, 2)).unwrap();
        let found = find_existing(dir.path(), "cat", ".png", ROOMY, unclaimed).unwrap();
        assert_eq!(found.file_name, "cat_6x2.png");
        assert_eq!(found.dimensions, Dimensions::new(6, 2));
        assert!(!dir.path().join("cat.png").exists());
        assert!(dir.path().join("cat_6x2.png").exists());
    }

    #[test]
    fn unreadable_copy_referenced_as_is() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat.png"), b"not a png").unwrap();
        let found = find_existing(dir.path(), "cat", ".png", ROOMY, unclaimed).unwrap();
        assert_eq!(found.file_name, "cat.png");
        assert_eq!(found.dimensions, Dimensions::UNKNOWN);
        assert!(dir.path().join("cat.png").exists());
    }

    #[test]
    fn existing_copy_kept_when_dimensioned_path_too_long() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat.png"), png_bytes(6, 2)).unwrap();
        let plain_len = dir.path().join("cat.png").as_os_str().len();
        let found = find_existing(dir.path(), "cat", ".png", plain_len + 2, unclaimed).unwrap();
        assert_eq!(found.file_name, "cat.png");
        assert_eq!(found.dimensions, Dimensions::new(6, 2));
        assert!(dir.path().join("cat.png").exists());
        assert!(!dir.path().join("cat_6x2.png").exists());
    }

    #[test]
    fn dimensioned_name_with_wrong_content_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat_4x5.png"), b"not a png").unwrap();
        fs::write(dir.path().join("cat_7x7.png"), png_bytes(3, 3)).unwrap();
        assert_eq!(find_existing(dir.path(), "cat", ".png", ROOMY, unclaimed), None);
    }

    #[test]
    fn claimed_base_not_taken_as_dimensioned_copy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("diagram_8x6.png"), png_bytes(8, 6)).unwrap();
        let claimed = |b: &str| b == "diagram_8x6";
        assert_eq!(find_existing(dir.path(), "diagram", ".png", ROOMY, claimed), None);
        assert_eq!(
            find_existing(dir.path(), "diagram", ".png", ROOMY, unclaimed)
                .map(|e| e.file_name),
            Some("diagram_8x6.png".to_string())
        );
    }
}
