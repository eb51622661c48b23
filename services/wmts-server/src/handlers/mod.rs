//! HTTP request handlers.

mod info;
mod tiles;

pub use info::{
    health_handler, layers_info_handler, readiness_handler, tile_by_xy_handler, time_handler,
    version_handler,
};
pub use tiles::wmts_tile_handler;
