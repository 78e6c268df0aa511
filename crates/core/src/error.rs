//! Error types for gridkit

use thiserror::Error;

/// Main error type for gridkit operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Search index build failed: {0}")]
    IndexBuild(String),

    #[error("Insufficient points: found {found}, need at least {required}")]
    InsufficientPoints { found: usize, required: usize },

    #[error("Singular {size}x{size} matrix")]
    SingularMatrix { size: usize },

    #[error("{0} used before initialize() or after finalize()")]
    NotInitialized(&'static str),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for gridkit operations
pub type Result<T> = std::result::Result<T, Error>;
