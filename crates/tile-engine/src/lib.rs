//! Tile engine: upstream WMS fetching, meta-tile splitting, atomic cache
//! writes and the concurrent bulk generator.

pub mod client;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod metatile;
mod write;

pub use client::{build_client, HttpClientConfig};
pub use error::{EngineError, EngineResult};
pub use fetch::fetch_png;
pub use generator::{BulkGenerator, GenerationReport, GeneratorOptions};
pub use metatile::{layer_tile_path, save_meta_tile, save_tile};
