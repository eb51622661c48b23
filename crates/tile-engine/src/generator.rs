//! Concurrent bulk tile generation.
//!
//! Shape: a producer enumerates meta-tile origins onto a bounded task
//! channel, a fixed pool of workers drains it, and a reporter task folds
//! per-meta-tile completions into an advisory progress counter. Workers
//! share nothing mutable beyond the counters; a failed meta-tile is logged
//! and the run continues.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use wmts_core::{BBox, Grid, LayerConfig};

use crate::error::EngineResult;
use crate::metatile::save_meta_tile;

/// One unit of worker work: the origin of a meta-tile block.
#[derive(Debug, Clone, Copy)]
struct MetaTileTask {
    zoom: u32,
    start_col: i64,
    start_row: i64,
}

/// Knobs of a bulk generation run.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Tiles per meta-tile side.
    pub meta_tile_size: u32,
    /// Pixel buffer cropped off every upstream render.
    pub buffer: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            meta_tile_size: 4,
            buffer: 50,
        }
    }
}

/// Outcome of a bulk generation run.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerationReport {
    /// Single tiles persisted.
    pub tiles_done: u64,
    /// Meta-tile tasks that failed after logging.
    pub meta_tiles_failed: u64,
}

/// Walks a bounding box at one or more zoom levels and fills the tile cache
/// through a worker pool.
pub struct BulkGenerator {
    client: Client,
    grid: Arc<Grid>,
    layer: LayerConfig,
    base_path: PathBuf,
    options: GeneratorOptions,
    progress: Arc<AtomicU64>,
}

impl BulkGenerator {
    pub fn new(
        client: Client,
        grid: Arc<Grid>,
        layer: LayerConfig,
        base_path: PathBuf,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            client,
            grid,
            layer,
            base_path,
            options,
            progress: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advisory count of tiles completed so far, across all zoom levels of
    /// the run. Display only; it may trail the files on disk.
    pub fn progress(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.progress)
    }

    /// Number of single tiles the bbox covers at `zoom`.
    pub fn total_tiles(&self, bbox: &BBox, zoom: u32) -> EngineResult<u64> {
        let (min_col, max_row) = self.grid.tile_of(bbox.x_min, bbox.y_min, zoom)?;
        let (max_col, min_row) = self.grid.tile_of(bbox.x_max, bbox.y_max, zoom)?;
        let cols = (max_col - min_col + 1).max(0) as u64;
        let rows = (max_row - min_row + 1).max(0) as u64;
        Ok(cols * rows)
    }

    /// Generate every tile the bbox covers for each zoom in `zoom_min..=
    /// zoom_max`. Zooms outside the grid's range are skipped with a warning.
    pub async fn run(
        &self,
        bbox: BBox,
        zoom_min: u32,
        zoom_max: u32,
    ) -> EngineResult<GenerationReport> {
        let mut report = GenerationReport::default();
        for zoom in zoom_min..=zoom_max {
            if zoom < self.grid.min_zoom() || zoom > self.grid.max_zoom() {
                warn!(
                    zoom,
                    min = self.grid.min_zoom(),
                    max = self.grid.max_zoom(),
                    "zoom level outside the grid, skipping"
                );
                continue;
            }
            let zoom_report = self.run_zoom(bbox, zoom).await?;
            report.tiles_done += zoom_report.tiles_done;
            report.meta_tiles_failed += zoom_report.meta_tiles_failed;
        }
        Ok(report)
    }

    async fn run_zoom(&self, bbox: BBox, zoom: u32) -> EngineResult<GenerationReport> {
        // Corner conversion; note the y inversion: the bbox's south edge
        // yields the largest row index.
        let (min_col, max_row) = self.grid.tile_of(bbox.x_min, bbox.y_min, zoom)?;
        let (max_col, min_row) = self.grid.tile_of(bbox.x_max, bbox.y_max, zoom)?;
        let total_tiles =
            ((max_col - min_col + 1).max(0) * (max_row - min_row + 1).max(0)) as u64;
        let m = self.options.meta_tile_size as i64;

        info!(
            zoom,
            min_col, max_col, min_row, max_row, total_tiles, "generating zoom level"
        );

        let capacity = (total_tiles / (m * m) as u64 + 1) as usize;
        let (task_tx, task_rx) = mpsc::channel::<MetaTileTask>(capacity);
        let task_rx = Arc::new(Mutex::new(task_rx));

        // Completion channel feeding the advisory progress counter.
        let (done_tx, mut done_rx) = mpsc::channel::<u64>(self.options.workers.max(1));
        let progress = Arc::clone(&self.progress);
        let tiles_done = Arc::new(AtomicU64::new(0));
        let reporter_tiles = Arc::clone(&tiles_done);
        let reporter = tokio::spawn(async move {
            while let Some(count) = done_rx.recv().await {
                progress.fetch_add(count, Ordering::Relaxed);
                reporter_tiles.fetch_add(count, Ordering::Relaxed);
            }
        });

        let failed = Arc::new(AtomicU64::new(0));
        let mut workers = Vec::with_capacity(self.options.workers);
        for worker_id in 0..self.options.workers.max(1) {
            let task_rx = Arc::clone(&task_rx);
            let done_tx = done_tx.clone();
            let failed = Arc::clone(&failed);
            let client = self.client.clone();
            let grid = Arc::clone(&self.grid);
            let layer = self.layer.clone();
            let base_path = self.base_path.clone();
            let (meta, buffer) = (self.options.meta_tile_size, self.options.buffer);

            workers.push(tokio::spawn(async move {
                loop {
                    let task = { task_rx.lock().await.recv().await };
                    let Some(task) = task else { break };
                    match save_meta_tile(
                        &client,
                        &grid,
                        &layer,
                        &base_path,
                        task.zoom,
                        task.start_col,
                        task.start_row,
                        meta,
                        meta,
                        buffer,
                    )
                    .await
                    {
                        Ok(_) => {
                            let _ = done_tx.send((meta * meta) as u64).await;
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            error!(
                                worker_id,
                                zoom = task.zoom,
                                start_col = task.start_col,
                                start_row = task.start_row,
                                error = %e,
                                "meta-tile failed"
                            );
                        }
                    }
                }
            }));
        }
        drop(done_tx);

        // Enqueue every meta-tile origin, then close the channel so workers
        // drain and exit.
        for start_row in (min_row..=max_row).step_by(m as usize) {
            for start_col in (min_col..=max_col).step_by(m as usize) {
                let task = MetaTileTask {
                    zoom,
                    start_col,
                    start_row,
                };
                if task_tx.send(task).await.is_err() {
                    break;
                }
            }
        }
        drop(task_tx);

        for worker in workers {
            let _ = worker.await;
        }
        let _ = reporter.await;

        Ok(GenerationReport {
            tiles_done: tiles_done.load(Ordering::Relaxed),
            meta_tiles_failed: failed.load(Ordering::Relaxed),
        })
    }
}
