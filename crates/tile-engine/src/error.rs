//! Error types for tile fetching and generation.

use thiserror::Error;

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Primary error type for upstream fetches, image handling and tile
/// persistence.
#[derive(Debug, Error)]
pub enum EngineError {
    // === Upstream Errors (retryable) ===
    #[error("WMS request failed: {0}")]
    UpstreamTransport(#[from] reqwest::Error),

    #[error("WMS request returned unexpected status: {0}")]
    UpstreamStatus(u16),

    // === Image Errors (fatal, never retried) ===
    #[error("Failed to decode image: {0}")]
    ImageDecode(image::ImageError),

    #[error("Failed to encode image: {0}")]
    ImageEncode(image::ImageError),

    #[error("Rendered image is {got_w}x{got_h}, too small to crop a {want_w}x{want_h} region")]
    ImageTooSmall {
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },

    // === Disk Errors ===
    #[error("Disk I/O failed at '{path}': {source}")]
    DiskIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // === Grid / Config Errors ===
    #[error(transparent)]
    Core(#[from] wmts_core::CoreError),

    // === Retry Exhaustion ===
    #[error("Failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<EngineError>,
    },
}

impl EngineError {
    pub(crate) fn disk(path: &std::path::Path, source: std::io::Error) -> Self {
        EngineError::DiskIo {
            path: path.display().to_string(),
            source,
        }
    }
}
