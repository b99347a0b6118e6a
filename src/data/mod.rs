pub mod source;
pub mod stats;

pub use source::{DataSource, SharedColumn};
pub use stats::{RegimeStats, Stats};
