//! JSON endpoints: layer metadata, tile lookup by coordinate, and the
//! utility routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use wmts_core::CoreError;

use crate::state::AppState;

/// Map a core error onto its HTTP status with the error text as body.
fn core_error_response(e: CoreError) -> Response {
    let status =
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, e.to_string()).into_response()
}

/// Response of `/getTileByXY/{layer}/{zoom}/{x}/{y}`.
#[derive(Debug, Serialize)]
pub struct TileInfoResponse {
    pub zoom: u32,
    pub col: i64,
    pub row: i64,
    pub wms_url: String,
    pub bbox: [f64; 4],
}

/// `GET /layersInfo` — the merged layer configuration as stored.
pub async fn layers_info_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(&state.config.layers).into_response()
}

/// `GET /getTileByXY/{layer}/{zoom}/{x}/{y}` — locate the tile containing a
/// projected coordinate and report its bbox and upstream WMS URL.
///
/// The optional `gutter` query parameter adds a pixel buffer to the
/// reported WMS URL.
pub async fn tile_by_xy_handler(
    State(state): State<Arc<AppState>>,
    Path((layer_name, zoom, x, y)): Path<(String, String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Ok(zoom) = zoom.parse::<u32>() else {
        return (StatusCode::BAD_REQUEST, "Invalid zoom level").into_response();
    };
    let Ok(x) = x.parse::<f64>() else {
        return (StatusCode::BAD_REQUEST, "Invalid x coordinate").into_response();
    };
    let Ok(y) = y.parse::<f64>() else {
        return (StatusCode::BAD_REQUEST, "Invalid y coordinate").into_response();
    };
    let gutter = match query.get("gutter").map(|g| g.parse::<u32>()) {
        None => 0,
        Some(Ok(g)) => g,
        Some(Err(_)) => {
            return (StatusCode::BAD_REQUEST, "Invalid gutter value").into_response();
        }
    };

    let layer = match state.config.layer(&layer_name) {
        Ok(layer) => layer,
        Err(e) => return core_error_response(e),
    };
    let grid = &state.grids[&layer_name];

    let (col, row) = match grid.tile_of(x, y, zoom) {
        Ok(tile) => tile,
        Err(e) => return core_error_response(e),
    };
    let bbox = match grid.tile_bbox(zoom, col, row) {
        Ok(bbox) => bbox,
        Err(e) => return core_error_response(e),
    };
    let wms_url = match grid.tile_wms_url(zoom, col, row, &layer.wms_layers, gutter) {
        Ok(url) => url,
        Err(e) => return core_error_response(e),
    };

    debug!(layer = %layer_name, zoom, col, row, "tile lookup by coordinate");
    Json(TileInfoResponse {
        zoom,
        col,
        row,
        wms_url,
        bbox: bbox.to_array(),
    })
    .into_response()
}

/// `GET /time` — current server time, RFC 3339.
pub async fn time_handler() -> Response {
    Json(serde_json::json!({ "time": chrono::Utc::now().to_rfc3339() })).into_response()
}

/// `GET /version` — build metadata.
pub async fn version_handler() -> Response {
    Json(serde_json::json!({
        "app": "wmts-server",
        "version": env!("CARGO_PKG_VERSION"),
        "repository": env!("CARGO_PKG_REPOSITORY"),
    }))
    .into_response()
}

/// `GET /health`
pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// `GET /readiness`
pub async fn readiness_handler() -> StatusCode {
    StatusCode::OK
}
