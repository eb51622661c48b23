//! Error types for the WMTS core crate.

use thiserror::Error;

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Primary error type for grid, bbox and configuration operations.
#[derive(Debug, Error)]
pub enum CoreError {
    // === Grid Errors ===
    #[error("Unsupported zoom level: {zoom}. Please choose between {min} and {max}")]
    UnsupportedZoom { zoom: u32, min: u32, max: u32 },

    #[error("Invalid column index: {col}. Please choose between 0 and {max}")]
    ColumnOutOfRange { col: i64, max: i64 },

    #[error("Invalid row index: {row}. Please choose between 0 and {max}")]
    RowOutOfRange { row: i64, max: i64 },

    #[error("Invalid grid definition: {0}")]
    InvalidGrid(String),

    // === BBox Errors ===
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    // === Configuration Errors ===
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    // === Environment Errors ===
    #[error("Invalid environment variable {var}: {message}")]
    EnvInvalid { var: String, message: String },
}

impl CoreError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            CoreError::UnsupportedZoom { .. }
            | CoreError::ColumnOutOfRange { .. }
            | CoreError::RowOutOfRange { .. }
            | CoreError::InvalidBbox(_)
            | CoreError::LayerNotFound(_) => 400,

            _ => 500,
        }
    }
}
