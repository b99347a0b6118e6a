//! geobrush: a shared highlight state for linked brushing across views of
//! one dataset, with headless scatter plot, histogram and scatter plot
//! matrix view models.

pub mod constants;
pub mod data;
pub mod error;
pub mod highlight;
pub mod perf;
pub mod project;
pub mod session;
pub mod views;

pub use error::{LinkError, Result};
