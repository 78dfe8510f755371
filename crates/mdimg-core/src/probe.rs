//! Image dimension probing.
//!
//! Only the header is decoded. Dimensions feed the filename suffix and nothing
//! else, so an undecodable image degrades to `0x0` instead of failing the
//! download.

use anyhow::{Context, Result};
use image::ImageReader;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Pixel dimensions; `0x0` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const UNKNOWN: Dimensions = Dimensions {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both sides are nonzero.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Reads width and height from in-memory image bytes. Returns `0x0` on any
/// failure (unknown format, truncated header, ...).
pub fn probe_dimensions(bytes: &[u8]) -> Dimensions {
    let reader = match ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("could not determine image format: {}", e);
            return Dimensions::UNKNOWN;
        }
    };
    match reader.into_dimensions() {
        Ok((width, height)) => Dimensions::new(width, height),
        Err(e) => {
            tracing::warn!("could not determine image dimensions: {}", e);
            Dimensions::UNKNOWN
        }
    }
}

/// Reads width and height of an image file already on disk.
///
/// Unlike [`probe_dimensions`] this reports failures, so callers can tell an
/// unreadable file apart from one with unknown dimensions.
pub fn probe_file(path: &Path) -> Result<Dimensions> {
    let (width, height) = ImageReader::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("read {}", path.display()))?
        .into_dimensions()
        .with_context(|| format!("decode {}", path.display()))?;
    Ok(Dimensions::new(width, height))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    /// Encodes a solid `width`x`height` PNG.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_dimensions() {
        assert_eq!(probe_dimensions(&png_bytes(400, 300)), Dimensions::new(400, 300));
    }

    #[test]
    fn garbage_is_unknown() {
        assert_eq!(probe_dimensions(b"<html>not an image</html>"), Dimensions::UNKNOWN);
        assert_eq!(probe_dimensions(&[]), Dimensions::UNKNOWN);
    }

    #[test]
    fn truncated_header_is_unknown() {
        let bytes = png_bytes(10, 10);
        assert_eq!(probe_dimensions(&bytes[..12]), Dimensions::UNKNOWN);
    }

    #[test]
    fn probe_file_reads_header() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.png");
        std::fs::write(&p, png_bytes(7, 3)).unwrap();
        assert_eq!(probe_file(&p).unwrap(), Dimensions::new(7, 3));
    }

    #[test]
    fn probe_file_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(probe_file(&dir.path().join("missing.png")).is_err());
        let p = dir.path().join("bad.png");
        std::fs::write(&p, b"nope").unwrap();
        assert!(probe_file(&p).is_err());
    }

    #[test]
    fn display_and_known() {
        assert_eq!(Dimensions::new(640, 480).to_string(), "640x480");
        assert!(Dimensions::new(1, 1).is_known());
        assert!(!Dimensions::new(0, 5).is_known());
    }
}
