//! Core types for the Lausanne WMTS tile service: bounding boxes, the tile
//! grid and its Swiss LV95 preset, WMS GetMap request construction, cache
//! path resolution, and the layer/cache configuration model.

pub mod bbox;
pub mod env;
pub mod error;
pub mod grid;
pub mod lausanne;
pub mod layer;
pub mod tile_path;
pub mod wms;

pub use bbox::BBox;
pub use error::{CoreError, CoreResult};
pub use grid::{Grid, Resolution};
pub use lausanne::{DEFAULT_IMAGE_FORMAT, DEFAULT_SPATIAL_REF, DEFAULT_TILE_SIZE};
pub use layer::{CacheConfig, Caches, Config, LayerConfig, LayerDefaults};
pub use tile_path::tile_path;
