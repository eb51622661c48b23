//! The canonical WMTS tile endpoint:
//! `/{prefix}/{layer}/{style}/{year}/{matrixSet}/{zoom}/{row}/{col}.{ext}`.
//!
//! Registered as the router fallback because the leading prefix is
//! configuration-driven and may span several path segments
//! (e.g. `tiles/1.0.0`). On cache miss the tile is fetched from the WMS
//! backend as a degenerate buffered single-tile render, persisted, then
//! served; the static-file service supplies Content-Type, conditional GET
//! and Range handling.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error};

use tile_engine::{layer_tile_path, save_tile};
use wmts_core::LayerConfig;

use crate::state::AppState;

/// Path parameters of one WMTS tile request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TileRequest {
    pub prefix: String,
    pub layer: String,
    pub style: String,
    pub year: String,
    pub matrix_set: String,
    pub zoom: u32,
    pub row: i64,
    pub col: i64,
    pub ext: String,
}

/// Split a request path into WMTS tile parameters.
///
/// The trailing seven segments are fixed; everything before them is the
/// layer's URL prefix.
pub(crate) fn parse_tile_path(path: &str) -> Option<TileRequest> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 8 {
        return None;
    }
    let tail = &segments[segments.len() - 7..];
    let (col_str, ext) = tail[6].rsplit_once('.')?;

    Some(TileRequest {
        prefix: segments[..segments.len() - 7].join("/"),
        layer: tail[0].to_string(),
        style: tail[1].to_string(),
        year: tail[2].to_string(),
        matrix_set: tail[3].to_string(),
        zoom: tail[4].parse().ok()?,
        row: tail[5].parse().ok()?,
        col: col_str.parse().ok()?,
        ext: ext.to_string(),
    })
}

/// Check the parsed path against the layer's configured WMTS metadata.
fn matches_layer(request: &TileRequest, layer: &LayerConfig) -> bool {
    request.prefix == layer.defaults.wmts_url_prefix
        && request.style == layer.defaults.wmts_url_style
        && request.year == layer.defaults.wmts_dimension_year
        && request.matrix_set == layer.defaults.wmts_matrix_set
        && request.ext == layer.defaults.image_extension
}

/// Fallback handler serving cached tiles, fetching them upstream on miss.
pub async fn wmts_tile_handler(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let Some(tile) = parse_tile_path(req.uri().path()) else {
        return (StatusCode::BAD_REQUEST, "Not a WMTS tile path").into_response();
    };

    let Ok(layer) = state.config.layer(&tile.layer) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("Layer not found: {}", tile.layer),
        )
            .into_response();
    };
    if !matches_layer(&tile, layer) {
        return (
            StatusCode::BAD_REQUEST,
            "Path does not match the layer configuration",
        )
            .into_response();
    }

    let grid = &state.grids[&tile.layer];
    if !grid.is_valid_tile(tile.zoom, tile.col, tile.row) {
        return (
            StatusCode::BAD_REQUEST,
            format!(
                "Tile out of range: zoom {}, col {}, row {}",
                tile.zoom, tile.col, tile.row
            ),
        )
            .into_response();
    }

    let file_path = layer_tile_path(&state.base_path, layer, tile.zoom, tile.row, tile.col);
    if !file_path.exists() {
        debug!(path = %file_path.display(), "cache miss, fetching from backend");
        if let Err(e) = save_tile(
            &state.client,
            grid,
            layer,
            &state.base_path,
            tile.zoom,
            tile.col,
            tile.row,
            state.buffer,
            state.max_retries,
        )
        .await
        {
            error!(error = %e, "tile fetch failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Tile fetch failed").into_response();
        }
    }

    match ServeFile::new(&file_path).oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            error!(error = %e, path = %file_path.display(), "serving tile failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Serving tile failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_path() {
        let tile =
            parse_tile_path("/tiles/1.0.0/osm_couleur/default/2021/swissgrid_05/3/42/17.png")
                .unwrap();
        assert_eq!(tile.prefix, "tiles/1.0.0");
        assert_eq!(tile.layer, "osm_couleur");
        assert_eq!(tile.style, "default");
        assert_eq!(tile.year, "2021");
        assert_eq!(tile.matrix_set, "swissgrid_05");
        assert_eq!(tile.zoom, 3);
        assert_eq!(tile.row, 42);
        assert_eq!(tile.col, 17);
        assert_eq!(tile.ext, "png");
    }

    #[test]
    fn test_parse_rejects_short_and_malformed_paths() {
        assert!(parse_tile_path("/too/short").is_none());
        assert!(parse_tile_path("/layersInfo").is_none());
        assert!(
            parse_tile_path("/tiles/1.0.0/osm/default/2021/swissgrid_05/x/42/17.png").is_none()
        );
        assert!(
            parse_tile_path("/tiles/1.0.0/osm/default/2021/swissgrid_05/3/42/17").is_none(),
            "missing extension"
        );
    }
}
