//! Application-wide constants and default values

/// Plotting and brushing defaults
pub mod plot {
    /// Default number of histogram intervals
    pub const DEFAULT_HISTOGRAM_BINS: usize = 7;

    /// Largest number of histogram intervals a view accepts
    pub const MAX_HISTOGRAM_BINS: usize = 200;

    /// Default pick radius for single-point selection (data units)
    pub const POINT_SELECT_TOLERANCE: f64 = 0.0004;
}

/// Dataset loading defaults
pub mod data {
    /// Rows scanned when inferring a CSV schema
    pub const CSV_INFER_SCHEMA_ROWS: usize = 100;

    /// Seconds per day, for date columns
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
}

/// Configuration file paths
pub mod config {
    /// Default session file name
    pub const SESSION_FILE: &str = "geobrush-session.json";
}
