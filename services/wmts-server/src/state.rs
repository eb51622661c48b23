//! Application state and shared resources.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use tile_engine::{build_client, HttpClientConfig};
use wmts_core::{Config, Grid};

/// Immutable state shared by every handler.
pub struct AppState {
    /// Merged layer configuration.
    pub config: Config,
    /// One grid per layer, bound to that layer's WMS backend.
    pub grids: HashMap<String, Grid>,
    /// Root of the on-disk tile cache.
    pub base_path: PathBuf,
    /// Pixel buffer for cache-miss fetches.
    pub buffer: u32,
    /// Upstream retries per cache-miss fetch.
    pub max_retries: u32,
    /// Pooled upstream client.
    pub client: Client,
}

impl AppState {
    /// Build the state from a loaded configuration.
    pub fn new(config: Config, buffer: u32) -> Result<Arc<AppState>> {
        let mut grids = HashMap::new();
        for (name, layer) in &config.layers {
            let grid = Grid::lausanne(
                layer.defaults.wms_backend_url.clone(),
                layer.defaults.wms_backend_prefix.clone(),
            )
            .with_context(|| format!("building grid for layer '{}'", name))?;
            grids.insert(name.clone(), grid);
        }
        info!(layers = grids.len(), buffer, "application state ready");

        let base_path = PathBuf::from(&config.caches.local.folder);
        let client = build_client(&HttpClientConfig::default())
            .context("building the upstream HTTP client")?;

        Ok(Arc::new(AppState {
            config,
            grids,
            base_path,
            buffer,
            max_retries: 2,
            client,
        }))
    }
}
