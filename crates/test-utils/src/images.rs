//! Deterministic raster fixtures.

use std::io::Cursor;

use image::{ImageOutputFormat, Rgba, RgbaImage};

/// Quadrant colors of [`quadrant_image`], row-major (NW, NE, SW, SE).
pub const QUADRANT_COLORS: [[u8; 4]; 4] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 0, 255],
];

/// A solid-color RGBA raster.
pub fn solid_image(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// A solid-color PNG.
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    encode_png(&solid_image(width, height, color))
}

/// A raster split into four solid quadrants colored per [`QUADRANT_COLORS`].
pub fn quadrant_image(width: u32, height: u32) -> RgbaImage {
    let (half_w, half_h) = (width / 2, height / 2);
    RgbaImage::from_fn(width, height, |x, y| {
        let quadrant = match (x >= half_w, y >= half_h) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        };
        Rgba(QUADRANT_COLORS[quadrant])
    })
}

/// A four-quadrant PNG; see [`quadrant_image`].
pub fn quadrant_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&quadrant_image(width, height))
}

/// Encode a raster as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png)
        .expect("in-memory PNG encoding cannot fail");
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_layout() {
        let img = quadrant_image(512, 512);
        assert_eq!(img.get_pixel(0, 0).0, QUADRANT_COLORS[0]);
        assert_eq!(img.get_pixel(511, 0).0, QUADRANT_COLORS[1]);
        assert_eq!(img.get_pixel(0, 511).0, QUADRANT_COLORS[2]);
        assert_eq!(img.get_pixel(511, 511).0, QUADRANT_COLORS[3]);
    }

    #[test]
    fn test_solid_png_decodes_back() {
        let png = solid_png(16, 8, [1, 2, 3, 255]);
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (16, 8));
        assert_eq!(img.get_pixel(7, 3).0, [1, 2, 3, 255]);
    }
}
