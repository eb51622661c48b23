//! Meta-tile fetching: one upstream render split into many cached tiles.
//!
//! Batching adjacent tiles into a single GetMap request cuts the number of
//! upstream round-trips by `N²` and, combined with the pixel buffer, hides
//! label and symbol clipping at tile seams.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::debug;

use wmts_core::{tile_path, Grid, LayerConfig, DEFAULT_IMAGE_FORMAT};

use crate::error::{EngineError, EngineResult};
use crate::fetch::fetch_png;
use crate::write::write_png_atomic;

/// Resolve the cache path of one tile of `layer` under `base_path`.
pub fn layer_tile_path(
    base_path: &Path,
    layer: &LayerConfig,
    zoom: u32,
    row: i64,
    col: i64,
) -> PathBuf {
    let ext = if layer.defaults.image_extension.is_empty() {
        DEFAULT_IMAGE_FORMAT
    } else {
        &layer.defaults.image_extension
    };
    tile_path(
        base_path,
        &layer.defaults.wmts_url_prefix,
        &layer.name,
        &layer.defaults.wmts_url_style,
        &layer.defaults.wmts_dimension_year,
        &layer.defaults.wmts_matrix_set,
        ext,
        zoom,
        row,
        col,
    )
}

/// Fetch a single tile through the retrying fetcher and persist it.
///
/// Returns the path of the cached file. Used by the HTTP façade on cache
/// miss; `buffer > 0` renders a margin upstream and crops it off.
#[allow(clippy::too_many_arguments)]
pub async fn save_tile(
    client: &Client,
    grid: &Grid,
    layer: &LayerConfig,
    base_path: &Path,
    zoom: u32,
    col: i64,
    row: i64,
    buffer: u32,
    max_retries: u32,
) -> EngineResult<PathBuf> {
    let url = grid.tile_wms_url(zoom, col, row, &layer.wms_layers, buffer)?;
    let path = layer_tile_path(base_path, layer, zoom, row, col);
    fetch_png(client, &url, &path, buffer, max_retries).await?;
    Ok(path)
}

/// Fetch a `num_cols × num_rows` block of tiles in one upstream request,
/// split the rendered image and persist each tile.
///
/// The block may hang off the grid edge: cells outside the tile matrix are
/// skipped silently and any pixels the upstream rendered for them are
/// discarded. Returns the number of tiles persisted.
#[allow(clippy::too_many_arguments)]
pub async fn save_meta_tile(
    client: &Client,
    grid: &Grid,
    layer: &LayerConfig,
    base_path: &Path,
    zoom: u32,
    start_col: i64,
    start_row: i64,
    num_cols: u32,
    num_rows: u32,
    buffer: u32,
) -> EngineResult<u32> {
    let bbox = grid.block_bbox(zoom, start_col, start_row, num_cols, num_rows)?;
    let width = num_cols * grid.tile_width_px();
    let height = num_rows * grid.tile_height_px();
    let params = grid.wms_params(
        bbox,
        &layer.wms_layers,
        width,
        height,
        buffer,
        DEFAULT_IMAGE_FORMAT,
    );
    let url = grid.wms_url(&params);

    let response = client.get(&url).send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(EngineError::UpstreamStatus(status.as_u16()));
    }
    let body = response.bytes().await?;
    let img = image::load_from_memory(&body).map_err(EngineError::ImageDecode)?;

    // Strip the buffer margin; what remains is the block at its nominal size.
    let img = if buffer > 0 {
        if img.width() <= 2 * buffer || img.height() <= 2 * buffer {
            return Err(EngineError::ImageTooSmall {
                got_w: img.width(),
                got_h: img.height(),
                want_w: width,
                want_h: height,
            });
        }
        img.crop_imm(buffer, buffer, width, height)
    } else {
        img
    };

    let tile_size = grid.tile_size();
    let mut saved = 0;
    for i in 0..num_rows {
        for j in 0..num_cols {
            let tile_row = start_row + i as i64;
            let tile_col = start_col + j as i64;
            if !grid.is_valid_tile(zoom, tile_col, tile_row) {
                continue;
            }
            let (x, y) = (j * tile_size, i * tile_size);
            if x + tile_size > img.width() || y + tile_size > img.height() {
                // Partial upstream render; the missing cells are re-fetched
                // on demand by the reader path.
                continue;
            }
            let tile = img.crop_imm(x, y, tile_size, tile_size).to_rgba8();
            let path = layer_tile_path(base_path, layer, zoom, tile_row, tile_col);
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| EngineError::disk(dir, e))?;
            }
            write_png_atomic(&path, &tile)?;
            saved += 1;
        }
    }

    debug!(
        zoom,
        start_col, start_row, num_cols, num_rows, saved, "meta-tile persisted"
    );
    Ok(saved)
}
