//! The Lausanne WMTS grid preset (Swiss LV95, EPSG:2056).

use std::collections::BTreeMap;

use crate::bbox::BBox;
use crate::error::CoreResult;
use crate::grid::{Grid, Resolution};

/// EPSG code of the Swiss LV95 projection.
pub const DEFAULT_SPATIAL_REF: u32 = 2056;

/// Tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Image format requested from the WMS backend when none is given.
pub const DEFAULT_IMAGE_FORMAT: &str = "png";

impl Grid {
    /// Grid used by the Lausanne tile service: LV95 extent
    /// `[2420000, 1030000, 2900000, 1350000]`, ten zoom levels with cell
    /// sizes from 50 m/px down to 0.05 m/px.
    pub fn lausanne(
        wms_backend_url: impl Into<String>,
        wms_start_params: impl Into<String>,
    ) -> CoreResult<Grid> {
        let resolutions: BTreeMap<u32, Resolution> = [
            (0, 178_571.428_571_428_58, 50.0, 38, 25),
            (1, 71_428.571_428_571_43, 20.0, 94, 63),
            (2, 35_714.285_714_285_72, 10.0, 188, 125),
            (3, 17_857.142_857_142_86, 5.0, 375, 250),
            (4, 8_928.571_428_571_43, 2.5, 750, 500),
            (5, 3_571.428_571_428_571_6, 1.0, 1875, 1250),
            (6, 1_785.714_285_714_285_8, 0.5, 3750, 2500),
            (7, 892.857_142_857_142_9, 0.25, 7500, 5000),
            (8, 357.142_857_142_857_17, 0.1, 18750, 12500),
            (9, 178.571_428_571_428_58, 0.05, 37500, 25000),
        ]
        .into_iter()
        .map(|(zoom, scale, cell, width, height)| {
            (
                zoom,
                Resolution {
                    scale_denominator: scale,
                    cell_size: cell,
                    matrix_width: Some(width),
                    matrix_height: Some(height),
                },
            )
        })
        .collect();

        Grid::new(
            BBox::new(2_420_000.0, 1_030_000.0, 2_900_000.0, 1_350_000.0)?,
            DEFAULT_SPATIAL_REF,
            DEFAULT_TILE_SIZE,
            2_420_000.0,
            1_350_000.0,
            wms_backend_url,
            wms_start_params,
            resolutions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lausanne_preset_shape() {
        let grid = Grid::lausanne("https://wms.example.org/mapserv", "ogcserver=main&").unwrap();
        assert_eq!(grid.min_zoom(), 0);
        assert_eq!(grid.max_zoom(), 9);
        assert_eq!(grid.num_zoom_levels(), 10);
        assert_eq!(grid.spatial_ref(), DEFAULT_SPATIAL_REF);
        assert_eq!(grid.tile_size(), DEFAULT_TILE_SIZE);
        assert_eq!(grid.unit(), "meters");
    }

    #[test]
    fn test_lausanne_rejects_empty_backend() {
        assert!(Grid::lausanne("", "ogcserver=main&").is_err());
    }
}
