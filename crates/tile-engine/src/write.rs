//! Atomic tile persistence.
//!
//! Tiles are written to a temp sibling and renamed into place so the reader
//! path never observes a partial or zero-byte PNG, even across a crash or a
//! concurrent write to the same path.

use std::io::{Cursor, Write};
use std::path::Path;

use image::RgbaImage;
use tempfile::NamedTempFile;

use crate::error::{EngineError, EngineResult};

/// Write `bytes` to `path` atomically. The parent directory must exist.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    let dir = path.parent().ok_or_else(|| {
        EngineError::disk(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"),
        )
    })?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| EngineError::disk(path, e))?;
    tmp.write_all(bytes).map_err(|e| EngineError::disk(path, e))?;
    tmp.persist(path)
        .map_err(|e| EngineError::disk(path, e.error))?;
    Ok(())
}

/// Encode `img` as PNG and write it to `path` atomically.
pub fn write_png_atomic(path: &Path, img: &RgbaImage) -> EngineResult<()> {
    let mut encoded = Cursor::new(Vec::new());
    img.write_to(&mut encoded, image::ImageOutputFormat::Png)
        .map_err(EngineError::ImageEncode)?;
    write_bytes_atomic(path, encoded.get_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_land_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        write_bytes_atomic(&path, b"not-a-real-png").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"not-a-real-png");
    }

    #[test]
    fn test_overwrite_is_atomic_replace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        write_bytes_atomic(&path, b"first").unwrap();
        write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let img = RgbaImage::from_pixel(16, 16, image::Rgba([10, 20, 30, 255]));
        write_png_atomic(&path, &img).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert_eq!(decoded.get_pixel(8, 8), &image::Rgba([10, 20, 30, 255]));
    }
}
