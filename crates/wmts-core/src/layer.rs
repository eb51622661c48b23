//! Layer and cache configuration, loaded once from a YAML file.
//!
//! The file carries global defaults under `layer_default_values` and a
//! `layers` mapping of per-layer overrides; loading merges the defaults into
//! every layer field-by-field, so handlers and the generator always see
//! fully-populated `LayerConfig` values.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Fields shared between the global defaults and per-layer overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerDefaults {
    #[serde(default)]
    pub wms_backend_url: String,
    #[serde(default)]
    pub wms_backend_prefix: String,
    /// Generation extent `[x_min, y_min, x_max, y_max]` in LV95 meters.
    #[serde(default)]
    pub wmts_bbox: Vec<f64>,
    #[serde(default)]
    pub wmts_url_prefix: String,
    #[serde(default)]
    pub wmts_url_style: String,
    #[serde(default)]
    pub wmts_dimension_name: String,
    #[serde(default)]
    pub wmts_dimension_year: String,
    #[serde(default)]
    pub wmts_matrix_set: String,
    #[serde(default)]
    pub image_extension: String,
    #[serde(default)]
    pub image_mime_type: String,
    /// Byte size of a known-empty tile; carried for detection tooling but
    /// never acted upon here.
    #[serde(default)]
    pub empty_tile_detection_size: u64,
    #[serde(default)]
    pub empty_tile_detection_md5_hash: String,
}

impl LayerDefaults {
    /// Fill every empty field from `defaults`.
    fn merge_from(&mut self, defaults: &LayerDefaults) {
        fn fill(target: &mut String, source: &str) {
            if target.is_empty() {
                *target = source.to_string();
            }
        }
        fill(&mut self.wms_backend_url, &defaults.wms_backend_url);
        fill(&mut self.wms_backend_prefix, &defaults.wms_backend_prefix);
        if self.wmts_bbox.is_empty() {
            self.wmts_bbox = defaults.wmts_bbox.clone();
        }
        fill(&mut self.wmts_url_prefix, &defaults.wmts_url_prefix);
        fill(&mut self.wmts_url_style, &defaults.wmts_url_style);
        fill(&mut self.wmts_dimension_name, &defaults.wmts_dimension_name);
        fill(&mut self.wmts_dimension_year, &defaults.wmts_dimension_year);
        fill(&mut self.wmts_matrix_set, &defaults.wmts_matrix_set);
        fill(&mut self.image_extension, &defaults.image_extension);
        fill(&mut self.image_mime_type, &defaults.image_mime_type);
        if self.empty_tile_detection_size == 0 {
            self.empty_tile_detection_size = defaults.empty_tile_detection_size;
        }
        fill(
            &mut self.empty_tile_detection_md5_hash,
            &defaults.empty_tile_detection_md5_hash,
        );
    }
}

/// Configuration of a single WMTS layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(flatten)]
    pub defaults: LayerDefaults,
    /// Comma-joined list of backend WMS layers, passed through opaquely.
    #[serde(default)]
    pub wms_layers: String,
    #[serde(rename = "layer_name", default)]
    pub name: String,
    #[serde(rename = "layer_title", default)]
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

/// Configuration of a single tile cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub cache_type: String,
    pub folder: String,
}

/// All configured caches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Caches {
    pub local: CacheConfig,
}

/// The whole YAML configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub caches: Caches,
    #[serde(default)]
    pub layer_default_values: Option<LayerDefaults>,
    #[serde(default)]
    pub layers: HashMap<String, LayerConfig>,
}

impl Config {
    /// Load and merge the configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> CoreResult<Config> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_str(&data).map_err(|source| CoreError::ConfigParse {
                path: path.display().to_string(),
                source,
            })?;
        config.apply_defaults();
        debug!(layers = config.layers.len(), "layer configuration loaded");
        Ok(config)
    }

    /// Merge `layer_default_values` into every layer and default each
    /// layer's name to its key in the mapping.
    fn apply_defaults(&mut self) {
        for (key, layer) in self.layers.iter_mut() {
            if let Some(defaults) = &self.layer_default_values {
                layer.defaults.merge_from(defaults);
            }
            if layer.name.is_empty() {
                layer.name = key.clone();
            }
        }
    }

    /// Look up a layer by name.
    pub fn layer(&self, name: &str) -> CoreResult<&LayerConfig> {
        self.layers
            .get(name)
            .ok_or_else(|| CoreError::LayerNotFound(name.to_string()))
    }
}
