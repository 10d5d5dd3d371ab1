//! Error types for raster and kernel operations

use thiserror::Error;

/// Main error type for core raster operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Scale mismatch: expected {expected} m cells, got {actual} m")]
    ScaleMismatch { expected: f64, actual: f64 },

    #[error("Grid mismatch: origin ({ex}, {ey}) vs ({ax}, {ay})")]
    GridMismatch { ex: f64, ey: f64, ax: f64, ay: f64 },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
