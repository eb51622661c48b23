//! WMS GetMap request construction.
//!
//! The backend renders arbitrary rectangular bboxes; every tile (or
//! meta-tile) fetch goes through one GetMap URL built here. Parameter values
//! are emitted without URL-escaping and the backend prefix fragment is
//! appended verbatim; the BBOX string uses the canonical fixed-decimal
//! formatting so upstream caches see byte-identical requests.

use std::collections::BTreeMap;

use crate::bbox::BBox;
use crate::error::CoreResult;
use crate::grid::Grid;
use crate::lausanne::DEFAULT_IMAGE_FORMAT;

impl Grid {
    /// Build the GetMap query parameters for rendering `bbox` at
    /// `width × height` pixels with a `buffer`-pixel margin on every side.
    ///
    /// The bbox is expanded by `buffer` pixels worth of ground units and
    /// WIDTH/HEIGHT grow by `2 · buffer`, so the caller can crop the margin
    /// off the rendered image and hide label clipping at tile seams.
    pub fn wms_params(
        &self,
        bbox: BBox,
        layers: &str,
        width: u32,
        height: u32,
        buffer: u32,
        image_format: &str,
    ) -> BTreeMap<String, String> {
        let width = if width == 0 { self.tile_size() } else { width };
        let height = if height == 0 { self.tile_size() } else { height };
        let image_format = if image_format.is_empty() {
            DEFAULT_IMAGE_FORMAT
        } else {
            image_format
        };

        let resolution = bbox.width() / width as f64;
        let buffered = bbox.expand(buffer as f64 * resolution);

        BTreeMap::from([
            ("SERVICE".to_string(), "WMS".to_string()),
            ("VERSION".to_string(), "1.3.0".to_string()),
            ("REQUEST".to_string(), "GetMap".to_string()),
            ("FORMAT".to_string(), format!("image/{}", image_format)),
            (
                "TRANSPARENT".to_string(),
                (image_format == DEFAULT_IMAGE_FORMAT).to_string(),
            ),
            ("LAYERS".to_string(), layers.to_string()),
            ("WIDTH".to_string(), (width + 2 * buffer).to_string()),
            ("HEIGHT".to_string(), (height + 2 * buffer).to_string()),
            ("CRS".to_string(), format!("EPSG:{}", self.spatial_ref())),
            ("STYLES".to_string(), String::new()),
            ("BBOX".to_string(), buffered.to_wms_string()),
        ])
    }

    /// Assemble the GetMap URL: `{backend}?{prefix}{k=v&k=v…}`.
    ///
    /// Parameter order carries no meaning for WMS; it is deterministic here
    /// only so the same request always yields the same URL.
    pub fn wms_url(&self, params: &BTreeMap<String, String>) -> String {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}{}", self.wms_backend_url(), self.wms_start_params(), query)
    }

    /// GetMap URL for a single tile, with an optional pixel buffer.
    pub fn tile_wms_url(
        &self,
        zoom: u32,
        col: i64,
        row: i64,
        layers: &str,
        buffer: u32,
    ) -> CoreResult<String> {
        let bbox = self.tile_bbox(zoom, col, row)?;
        let params = self.wms_params(
            bbox,
            layers,
            self.tile_width_px(),
            self.tile_height_px(),
            buffer,
            DEFAULT_IMAGE_FORMAT,
        );
        Ok(self.wms_url(&params))
    }
}

#[cfg(test)]
mod tests {
    use crate::bbox::BBox;
    use crate::grid::Grid;

    fn test_grid() -> Grid {
        Grid::lausanne("https://wms.example.org/mapserv", "ogcserver=main&").unwrap()
    }

    #[test]
    fn test_buffered_params() {
        let grid = test_grid();
        let bbox = BBox::new(2_420_000.0, 1_337_200.0, 2_432_800.0, 1_350_000.0).unwrap();
        let params = grid.wms_params(bbox, "osm_color", 256, 256, 50, "png");

        assert_eq!(params["SERVICE"], "WMS");
        assert_eq!(params["VERSION"], "1.3.0");
        assert_eq!(params["REQUEST"], "GetMap");
        assert_eq!(params["FORMAT"], "image/png");
        assert_eq!(params["TRANSPARENT"], "true");
        assert_eq!(params["LAYERS"], "osm_color");
        assert_eq!(params["WIDTH"], "356");
        assert_eq!(params["HEIGHT"], "356");
        assert_eq!(params["CRS"], "EPSG:2056");
        assert_eq!(params["STYLES"], "");
        // 50 px buffer at 50 m/px = 2500 m on every side
        assert_eq!(
            params["BBOX"],
            "2417500.000000,1334700.000000,2435300.000000,1352500.000000"
        );
    }

    #[test]
    fn test_zero_buffer_keeps_dimensions() {
        let grid = test_grid();
        let bbox = BBox::new(2_420_000.0, 1_337_200.0, 2_432_800.0, 1_350_000.0).unwrap();
        let params = grid.wms_params(bbox, "osm_color", 256, 256, 0, "png");
        assert_eq!(params["WIDTH"], "256");
        assert_eq!(params["HEIGHT"], "256");
        assert_eq!(
            params["BBOX"],
            "2420000.000000,1337200.000000,2432800.000000,1350000.000000"
        );
    }

    #[test]
    fn test_non_png_is_opaque() {
        let grid = test_grid();
        let bbox = BBox::new(0.0, 0.0, 1000.0, 1000.0).unwrap();
        let params = grid.wms_params(bbox, "ortho", 256, 256, 0, "jpeg");
        assert_eq!(params["FORMAT"], "image/jpeg");
        assert_eq!(params["TRANSPARENT"], "false");
    }

    #[test]
    fn test_url_prefix_is_verbatim() {
        let grid = test_grid();
        let bbox = BBox::new(0.0, 0.0, 1000.0, 1000.0).unwrap();
        let params = grid.wms_params(bbox, "a,b", 256, 256, 0, "png");
        let url = grid.wms_url(&params);
        assert!(url.starts_with("https://wms.example.org/mapserv?ogcserver=main&"));
        assert!(url.contains("LAYERS=a,b"));
        assert!(url.contains("BBOX=0.000000,0.000000,1000.000000,1000.000000"));
    }

    #[test]
    fn test_zero_dimensions_fall_back_to_tile_size() {
        let grid = test_grid();
        let bbox = grid.tile_bbox(0, 0, 0).unwrap();
        let params = grid.wms_params(bbox, "l", 0, 0, 0, "");
        assert_eq!(params["WIDTH"], "256");
        assert_eq!(params["HEIGHT"], "256");
        assert_eq!(params["FORMAT"], "image/png");
    }

    #[test]
    fn test_tile_wms_url() {
        let grid = test_grid();
        let url = grid.tile_wms_url(0, 0, 0, "osm_color", 0).unwrap();
        assert!(url.contains("BBOX=2420000.000000,1337200.000000,2432800.000000,1350000.000000"));
        assert!(grid.tile_wms_url(42, 0, 0, "osm_color", 0).is_err());
    }
}
