//! Error handling for GCodeView
//!
//! Provides error types for the layers of the viewer:
//! - Viewer errors (move input contract, buffer layout, GPU transfer)
//! - Settings errors (reading, parsing and validating configuration)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Viewer error type
///
/// Represents contract violations detected while building toolpath buffers,
/// and failures reported by the GPU backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// Move ids must equal their position in the sequence
    #[error("Move at position {index} has id {id}, expected {index}")]
    MoveOrder {
        /// Position of the offending record in the input slice.
        index: usize,
        /// The id carried by the record.
        id: usize,
    },

    /// A vertex format was paired with a primitive that cannot use it
    #[error("Vertex format {format} cannot store {primitive} primitives")]
    FormatMismatch {
        /// The primitive kind name.
        primitive: &'static str,
        /// The vertex format name.
        format: &'static str,
    },

    /// Chunk capacity is outside the range a chunk can address
    #[error("Chunk capacity {capacity} must be within {min}..={max} vertices")]
    InvalidCapacity {
        /// The requested capacity in vertices.
        capacity: usize,
        /// One footprint of the primitive.
        min: usize,
        /// The 16-bit index limit.
        max: usize,
    },

    /// The GPU backend failed to create or fill a resource
    #[error("GPU backend error: {0}")]
    Gpu(String),
}

/// Settings error type
///
/// Represents errors related to loading, saving and validating viewer settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        /// The settings file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Settings file could not be written
    #[error("Failed to write settings file {path}: {source}")]
    Write {
        /// The settings file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Settings content could not be parsed
    #[error("Failed to parse settings: {reason}")]
    Parse {
        /// The parser message.
        reason: String,
    },

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {reason}")]
    Serialize {
        /// The serializer message.
        reason: String,
    },

    /// The file extension is neither `json` nor `toml`
    #[error("Unsupported settings format: {extension}")]
    UnsupportedFormat {
        /// The file extension that was found.
        extension: String,
    },

    /// A settings value is out of its allowed range
    #[error("Invalid setting {setting}: {reason}")]
    Invalid {
        /// The offending setting.
        setting: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Main error type for GCodeView
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Viewer error
    #[error(transparent)]
    Viewer(#[from] ViewerError),

    /// Settings error
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a viewer error
    pub fn is_viewer_error(&self) -> bool {
        matches!(self, Error::Viewer(_))
    }

    /// Check if this is a settings error
    pub fn is_settings_error(&self) -> bool {
        matches!(self, Error::Settings(_))
    }

    /// Check if the move input violated the ordering contract
    pub fn is_move_order(&self) -> bool {
        matches!(self, Error::Viewer(ViewerError::MoveOrder { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for engine operations
pub type ViewerResult<T> = std::result::Result<T, ViewerError>;
