//! Error types for geobrush
//!
//! One error enum covers dataset loading, the highlight hub, the view
//! registry and session replay.

use thiserror::Error;

/// Main error type for geobrush operations
#[derive(Error, Debug)]
pub enum LinkError {
    /// File I/O error
    #[error("Failed to access file: {0}")]
    FileIo(#[from] std::io::Error),

    /// Polars data processing error
    #[error("Data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported file format
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Column not found in data
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Invalid column index
    #[error("Invalid column index: {index} (available: {max})")]
    InvalidColumnIndex { index: usize, max: usize },

    /// Empty dataset error
    #[error("Dataset is empty or has no rows")]
    EmptyDataset,

    /// Two sequences that must describe the same observations differ in length
    #[error("Size mismatch: expected {expected} observations, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Observation index outside the selection universe
    #[error("Observation {index} out of range (size: {size})")]
    ObservationOutOfRange { index: usize, size: usize },

    /// The highlight hub was already torn down
    #[error("Highlight state has been closed")]
    HubClosed,

    /// A hub mutation was attempted while observers were being notified
    #[error("Highlight state mutated during notification")]
    ReentrantNotify,

    /// Removal of an observer that is not registered
    #[error("Observer {id} is not registered")]
    UnknownObserver { id: u64 },

    /// No open view has this name
    #[error("View '{name}' is not open")]
    ViewNotFound { name: String },

    /// A view with this name is already open
    #[error("View '{name}' is already open")]
    DuplicateView { name: String },

    /// Matrix cell address outside the grid
    #[error("Cell ({row}, {col}) outside {size}x{size} matrix")]
    InvalidCell { row: usize, col: usize, size: usize },

    /// Histogram interval outside the view's bins
    #[error("Bin {bin} out of range ({bins} bins)")]
    InvalidBin { bin: usize, bins: usize },
}

/// Result type alias for geobrush operations
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    /// Get a user-friendly error message suitable for terminal output
    pub fn user_message(&self) -> String {
        match self {
            LinkError::FileIo(e) => format!("File error: {}", e),
            LinkError::Polars(e) => format!("Data error: {}", e),
            LinkError::Json(e) => format!("JSON error: {}", e),
            LinkError::Config(msg) => format!("Config error: {}", msg),
            LinkError::UnsupportedFormat { extension } => {
                format!("Unsupported file format: '.{}'", extension)
            }
            LinkError::ColumnNotFound { column } => {
                format!("Column '{}' not found", column)
            }
            LinkError::InvalidColumnIndex { index, max } => {
                format!("Column index {} out of range (max: {})", index, max)
            }
            LinkError::EmptyDataset => "Dataset is empty".to_string(),
            LinkError::SizeMismatch { expected, actual } => {
                format!("Expected {} observations, got {}", expected, actual)
            }
            LinkError::ObservationOutOfRange { index, size } => {
                format!("Observation {} does not exist ({} observations)", index, size)
            }
            LinkError::HubClosed => "Selection is no longer available".to_string(),
            LinkError::ReentrantNotify => {
                "Selection changed while views were updating".to_string()
            }
            LinkError::UnknownObserver { id } => format!("Unknown view observer #{}", id),
            LinkError::ViewNotFound { name } => format!("No open view named '{}'", name),
            LinkError::DuplicateView { name } => format!("A view named '{}' is already open", name),
            LinkError::InvalidCell { row, col, size } => {
                format!("Cell ({}, {}) is outside the {}x{} matrix", row, col, size, size)
            }
            LinkError::InvalidBin { bin, bins } => {
                format!("Interval {} does not exist ({} intervals)", bin, bins)
            }
        }
    }

    /// Get a short title for the error
    pub fn title(&self) -> &'static str {
        match self {
            LinkError::FileIo(_) => "File Error",
            LinkError::Polars(_) => "Data Error",
            LinkError::Json(_) => "JSON Error",
            LinkError::Config(_) => "Configuration Error",
            LinkError::UnsupportedFormat { .. } => "Unsupported Format",
            LinkError::ColumnNotFound { .. } => "Column Not Found",
            LinkError::InvalidColumnIndex { .. } => "Invalid Column",
            LinkError::EmptyDataset => "Empty Dataset",
            LinkError::SizeMismatch { .. } => "Size Mismatch",
            LinkError::ObservationOutOfRange { .. } => "Invalid Observation",
            LinkError::HubClosed => "Selection Closed",
            LinkError::ReentrantNotify => "Reentrant Update",
            LinkError::UnknownObserver { .. } => "Unknown Observer",
            LinkError::ViewNotFound { .. } => "View Not Found",
            LinkError::DuplicateView { .. } => "Duplicate View",
            LinkError::InvalidCell { .. } => "Invalid Cell",
            LinkError::InvalidBin { .. } => "Invalid Interval",
        }
    }
}
