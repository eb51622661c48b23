//! Shared test utilities for the lausanne-wmts workspace.
//!
//! Provides PNG raster fixtures and an in-process mock WMS upstream for
//! engine and server tests.
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod images;
pub mod wms;

pub use images::*;
pub use wms::*;
