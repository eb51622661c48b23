//! WMTS tile grid: the bijection between projected coordinates and tile
//! indices per zoom level.
//!
//! The tile-index space is an axis-aligned integer lattice with the y axis
//! inverted relative to the coordinate system: row 0 is the northernmost
//! row, column 0 the westernmost column. Index computation uses floor, so a
//! coordinate sitting exactly on a tile boundary belongs to the tile to the
//! right/below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::error::{CoreError, CoreResult};

/// Properties of one zoom level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Resolution {
    /// Scale denominator for the zoom level.
    pub scale_denominator: f64,
    /// Cell size in meters per pixel.
    pub cell_size: f64,
    /// Number of tile columns, if fixed by the matrix set definition.
    pub matrix_width: Option<u32>,
    /// Number of tile rows, if fixed by the matrix set definition.
    pub matrix_height: Option<u32>,
}

/// An immutable WMTS tile grid over a projected CRS.
///
/// Built once at startup and shared read-only between the HTTP façade and
/// all generator workers; no method takes a lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    /// Bounding box of the full grid extent.
    bbox: BBox,
    /// EPSG code of the projected CRS (2056 for Swiss LV95).
    spatial_ref: u32,
    /// Unit of the CRS axes.
    unit: String,
    /// Meters per CRS unit (1 for LV95).
    meters_per_unit: u32,
    /// Tile edge length in pixels.
    tile_size: u32,
    /// X coordinate of the top-left corner of tile (0, 0).
    top_left_x: f64,
    /// Y coordinate of the top-left corner of tile (0, 0).
    top_left_y: f64,
    /// Upstream WMS endpoint.
    wms_backend_url: String,
    /// Opaque query fragment the backend requires ahead of the WMS
    /// parameters, appended verbatim (already ends with `&`).
    wms_start_params: String,
    /// Zoom level -> resolution, keys contiguous.
    resolutions: BTreeMap<u32, Resolution>,
}

impl Grid {
    /// Build a grid, validating the invariants the rest of the crate relies
    /// on: non-empty backend URL and resolutions, the top-left anchor at the
    /// north-west corner of the extent, contiguous zoom keys, strictly
    /// decreasing cell sizes, and matrix dimensions consistent with the
    /// extent within rounding.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bbox: BBox,
        spatial_ref: u32,
        tile_size: u32,
        top_left_x: f64,
        top_left_y: f64,
        wms_backend_url: impl Into<String>,
        wms_start_params: impl Into<String>,
        resolutions: BTreeMap<u32, Resolution>,
    ) -> CoreResult<Self> {
        let wms_backend_url = wms_backend_url.into();
        if wms_backend_url.is_empty() {
            return Err(CoreError::InvalidGrid(
                "wms_backend_url cannot be empty".into(),
            ));
        }
        if resolutions.is_empty() {
            return Err(CoreError::InvalidGrid(
                "at least one zoom level is required".into(),
            ));
        }
        if top_left_x != bbox.x_min || top_left_y != bbox.y_max {
            return Err(CoreError::InvalidGrid(format!(
                "top-left anchor ({}, {}) must sit at the north-west corner of the extent ({}, {})",
                top_left_x, top_left_y, bbox.x_min, bbox.y_max
            )));
        }

        let min_zoom = *resolutions.keys().next().unwrap_or(&0);
        let mut prev: Option<(u32, f64)> = None;
        for (&zoom, res) in &resolutions {
            if let Some((prev_zoom, prev_cell)) = prev {
                if zoom != prev_zoom + 1 {
                    return Err(CoreError::InvalidGrid(format!(
                        "zoom levels must be contiguous, missing level {}",
                        prev_zoom + 1
                    )));
                }
                if res.cell_size >= prev_cell {
                    return Err(CoreError::InvalidGrid(format!(
                        "cell_size must strictly decrease with zoom, level {} has {} after {}",
                        zoom, res.cell_size, prev_cell
                    )));
                }
            } else if zoom != min_zoom {
                unreachable!("BTreeMap iteration starts at the smallest key");
            }
            if res.cell_size <= 0.0 {
                return Err(CoreError::InvalidGrid(format!(
                    "cell_size must be positive at zoom {}",
                    zoom
                )));
            }

            let span = tile_size as f64 * res.cell_size;
            if let Some(w) = res.matrix_width {
                let derived = (bbox.width() / span).round() as u32;
                if w != derived {
                    return Err(CoreError::InvalidGrid(format!(
                        "matrix_width {} at zoom {} disagrees with derived {}",
                        w, zoom, derived
                    )));
                }
            }
            if let Some(h) = res.matrix_height {
                let derived = (bbox.height() / span).round() as u32;
                if h != derived {
                    return Err(CoreError::InvalidGrid(format!(
                        "matrix_height {} at zoom {} disagrees with derived {}",
                        h, zoom, derived
                    )));
                }
            }
            prev = Some((zoom, res.cell_size));
        }

        Ok(Self {
            bbox,
            spatial_ref,
            unit: "meters".to_string(),
            meters_per_unit: 1,
            tile_size,
            top_left_x,
            top_left_y,
            wms_backend_url,
            wms_start_params: wms_start_params.into(),
            resolutions,
        })
    }

    /// Bounding box of the full grid extent.
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// EPSG code of the grid CRS.
    pub fn spatial_ref(&self) -> u32 {
        self.spatial_ref
    }

    /// Unit of the CRS axes.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Tile edge length in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Upstream WMS endpoint.
    pub fn wms_backend_url(&self) -> &str {
        &self.wms_backend_url
    }

    /// Opaque query fragment prepended to WMS parameters.
    pub fn wms_start_params(&self) -> &str {
        &self.wms_start_params
    }

    /// Tile width in pixels (`tile_size · meters_per_unit`).
    pub fn tile_width_px(&self) -> u32 {
        self.tile_size * self.meters_per_unit
    }

    /// Tile height in pixels (`tile_size · meters_per_unit`).
    pub fn tile_height_px(&self) -> u32 {
        self.tile_size * self.meters_per_unit
    }

    /// Total width of the grid extent in meters.
    pub fn width(&self) -> f64 {
        self.bbox.width()
    }

    /// Total height of the grid extent in meters.
    pub fn height(&self) -> f64 {
        self.bbox.height()
    }

    /// Minimum supported zoom level.
    pub fn min_zoom(&self) -> u32 {
        *self.resolutions.keys().next().expect("validated non-empty")
    }

    /// Maximum supported zoom level.
    pub fn max_zoom(&self) -> u32 {
        *self
            .resolutions
            .keys()
            .next_back()
            .expect("validated non-empty")
    }

    /// Number of supported zoom levels.
    pub fn num_zoom_levels(&self) -> usize {
        self.resolutions.len()
    }

    /// Resolution entry for a zoom level.
    pub fn resolution(&self, zoom: u32) -> CoreResult<&Resolution> {
        self.resolutions
            .get(&zoom)
            .ok_or(CoreError::UnsupportedZoom {
                zoom,
                min: self.min_zoom(),
                max: self.max_zoom(),
            })
    }

    /// Ground span of one tile edge at `zoom`, in meters.
    fn tile_span(&self, zoom: u32) -> CoreResult<f64> {
        Ok(self.tile_size as f64 * self.resolution(zoom)?.cell_size)
    }

    /// Tile indices `(col, row)` containing the coordinate `(x, y)`.
    ///
    /// No range clamping: coordinates outside the extent yield negative or
    /// past-the-end indices, and callers expecting bounded output must check
    /// with [`Grid::is_valid_tile`].
    pub fn tile_of(&self, x: f64, y: f64, zoom: u32) -> CoreResult<(i64, i64)> {
        let span = self.tile_span(zoom)?;
        let col = ((x - self.top_left_x) / span).floor() as i64;
        let row = ((self.top_left_y - y) / span).floor() as i64;
        Ok((col, row))
    }

    /// Maximum number of tile columns at `zoom`.
    ///
    /// Prefers the matrix dimension fixed by the matrix set; otherwise
    /// derives it from the grid extent and cell size.
    pub fn max_num_cols(&self, zoom: u32) -> CoreResult<i64> {
        let res = self.resolution(zoom)?;
        if let Some(w) = res.matrix_width {
            return Ok(w as i64);
        }
        let span = self.tile_size as f64 * res.cell_size;
        Ok((self.width() / span).round() as i64)
    }

    /// Maximum number of tile rows at `zoom`.
    pub fn max_num_rows(&self, zoom: u32) -> CoreResult<i64> {
        let res = self.resolution(zoom)?;
        if let Some(h) = res.matrix_height {
            return Ok(h as i64);
        }
        let span = self.tile_size as f64 * res.cell_size;
        Ok((self.height() / span).round() as i64)
    }

    /// Check whether `(col, row)` is addressable at `zoom`.
    ///
    /// Inclusive on both ends; callers iterating `col ∈ [min_col, max_col]`
    /// inclusive must match this predicate.
    pub fn is_valid_tile(&self, zoom: u32, col: i64, row: i64) -> bool {
        let (Ok(max_cols), Ok(max_rows)) = (self.max_num_cols(zoom), self.max_num_rows(zoom))
        else {
            return false;
        };
        (0..=max_cols).contains(&col) && (0..=max_rows).contains(&row)
    }

    /// Bounding box of the tile `(col, row)` at `zoom`.
    pub fn tile_bbox(&self, zoom: u32, col: i64, row: i64) -> CoreResult<BBox> {
        let max_cols = self.max_num_cols(zoom)?;
        if col < 0 || col > max_cols {
            return Err(CoreError::ColumnOutOfRange { col, max: max_cols });
        }
        let max_rows = self.max_num_rows(zoom)?;
        if row < 0 || row > max_rows {
            return Err(CoreError::RowOutOfRange { row, max: max_rows });
        }

        let span = self.tile_span(zoom)?;
        let x_min = self.top_left_x + col as f64 * span;
        let y_max = self.top_left_y - row as f64 * span;
        BBox::new(x_min, y_max - span, x_min + span, y_max)
    }

    /// Bounding box of a `num_cols × num_rows` block of tiles whose top-left
    /// tile is `(start_col, start_row)`.
    ///
    /// Computed geometrically so that a trailing block hanging off the grid
    /// edge is still addressable; the caller skips out-of-matrix cells when
    /// splitting the rendered block.
    pub fn block_bbox(
        &self,
        zoom: u32,
        start_col: i64,
        start_row: i64,
        num_cols: u32,
        num_rows: u32,
    ) -> CoreResult<BBox> {
        let span = self.tile_span(zoom)?;
        let x_min = self.top_left_x + start_col as f64 * span;
        let y_max = self.top_left_y - start_row as f64 * span;
        BBox::new(
            x_min,
            y_max - num_rows as f64 * span,
            x_min + num_cols as f64 * span,
            y_max,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_grid() -> Grid {
        Grid::lausanne("https://wms.example.org/mapserv", "ogcserver=main&").unwrap()
    }

    #[test]
    fn test_tile_of_origin() {
        let grid = test_grid();
        assert_eq!(grid.tile_of(2420000.0, 1350000.0, 0).unwrap(), (0, 0));
    }

    #[test]
    fn test_tile_bbox_origin() {
        let grid = test_grid();
        // cell_size(0) = 50, tile span = 256 * 50 = 12800
        let bbox = grid.tile_bbox(0, 0, 0).unwrap();
        assert_eq!(bbox.to_array(), [2420000.0, 1337200.0, 2432800.0, 1350000.0]);
    }

    #[test]
    fn test_boundary_belongs_to_next_tile() {
        let grid = test_grid();
        // Just inside tile (0, 0).
        assert_eq!(
            grid.tile_of(2432799.999, 1337200.001, 0).unwrap(),
            (0, 0)
        );
        // Exactly on the shared corner: floor model assigns the next tile.
        assert_eq!(grid.tile_of(2432800.0, 1337200.0, 0).unwrap(), (1, 1));
    }

    #[test]
    fn test_matrix_dimensions() {
        let grid = test_grid();
        assert_eq!(grid.max_num_cols(2).unwrap(), 188);
        assert_eq!(grid.max_num_rows(2).unwrap(), 125);
        // Last fully-interior tile sits inside the grid extent.
        let last = grid.tile_bbox(2, 187, 124).unwrap();
        assert!(grid.bbox().contains(&last));
    }

    #[test]
    fn test_bijection_round_trip() {
        let grid = test_grid();
        let eps = 1e-6;
        for zoom in grid.min_zoom()..=grid.max_zoom() {
            for &(col, row) in &[(0i64, 0i64), (3, 2), (17, 11)] {
                let bbox = grid.tile_bbox(zoom, col, row).unwrap();
                let got = grid
                    .tile_of(bbox.x_min + eps, bbox.y_max - eps, zoom)
                    .unwrap();
                assert_eq!(got, (col, row), "zoom {}", zoom);
            }
        }
    }

    #[test]
    fn test_tile_span_matches_cell_size() {
        let grid = test_grid();
        for zoom in grid.min_zoom()..=grid.max_zoom() {
            let bbox = grid.tile_bbox(zoom, 1, 1).unwrap();
            let expected = grid.tile_size() as f64 * grid.resolution(zoom).unwrap().cell_size;
            assert_eq!(bbox.width(), expected);
            assert_eq!(bbox.height(), expected);
        }
    }

    #[test]
    fn test_matrix_consistency() {
        let grid = test_grid();
        for zoom in grid.min_zoom()..=grid.max_zoom() {
            let span = grid.tile_size() as f64 * grid.resolution(zoom).unwrap().cell_size;
            let cols = grid.max_num_cols(zoom).unwrap() as f64;
            let rows = grid.max_num_rows(zoom).unwrap() as f64;
            assert!((cols * span - grid.width()).abs() <= span);
            assert!((rows * span - grid.height()).abs() <= span);
        }
    }

    #[test]
    fn test_unsupported_zoom() {
        let grid = test_grid();
        assert!(matches!(
            grid.tile_of(2420000.0, 1350000.0, 42),
            Err(CoreError::UnsupportedZoom { zoom: 42, .. })
        ));
        assert!(matches!(
            grid.tile_bbox(42, 0, 0),
            Err(CoreError::UnsupportedZoom { .. })
        ));
    }

    #[test]
    fn test_out_of_range_indices() {
        let grid = test_grid();
        assert!(matches!(
            grid.tile_bbox(0, -1, 0),
            Err(CoreError::ColumnOutOfRange { .. })
        ));
        assert!(matches!(
            grid.tile_bbox(0, 0, 99),
            Err(CoreError::RowOutOfRange { .. })
        ));
        assert!(!grid.is_valid_tile(0, -1, 0));
        assert!(!grid.is_valid_tile(99, 0, 0));
        assert!(grid.is_valid_tile(0, 0, 0));
    }

    #[test]
    fn test_block_bbox_spans_corner_tiles() {
        let grid = test_grid();
        let top_left = grid.tile_bbox(2, 4, 8).unwrap();
        let bottom_right = grid.tile_bbox(2, 7, 11).unwrap();
        let block = grid.block_bbox(2, 4, 8, 4, 4).unwrap();
        assert_eq!(block.x_min, top_left.x_min);
        assert_eq!(block.y_max, top_left.y_max);
        assert_eq!(block.x_max, bottom_right.x_max);
        assert_eq!(block.y_min, bottom_right.y_min);
    }

    #[test]
    fn test_rejects_non_contiguous_levels() {
        let bbox = BBox::new(0.0, 0.0, 25600.0, 25600.0).unwrap();
        let mut resolutions = BTreeMap::new();
        resolutions.insert(
            0,
            Resolution {
                scale_denominator: 100.0,
                cell_size: 100.0,
                matrix_width: None,
                matrix_height: None,
            },
        );
        resolutions.insert(
            2,
            Resolution {
                scale_denominator: 50.0,
                cell_size: 50.0,
                matrix_width: None,
                matrix_height: None,
            },
        );
        let err = Grid::new(bbox, 2056, 256, 0.0, 25600.0, "http://wms", "", resolutions);
        assert!(matches!(err, Err(CoreError::InvalidGrid(_))));
    }

    #[test]
    fn test_rejects_bad_anchor() {
        let bbox = BBox::new(0.0, 0.0, 25600.0, 25600.0).unwrap();
        let mut resolutions = BTreeMap::new();
        resolutions.insert(
            0,
            Resolution {
                scale_denominator: 100.0,
                cell_size: 100.0,
                matrix_width: None,
                matrix_height: None,
            },
        );
        let err = Grid::new(bbox, 2056, 256, 0.0, 0.0, "http://wms", "", resolutions);
        assert!(matches!(err, Err(CoreError::InvalidGrid(_))));
    }
}
