use crate::error::{LinkError, Result};
use polars::prelude::*;
use serde::Serialize;

/// Statistics results
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Statistics of one variable over all observations and over the two
/// regimes induced by the current selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RegimeStats {
    pub all: Stats,
    pub selected: Stats,
    pub excluded: Stats,
}

/// Calculate comprehensive statistics from a Series using polars.
/// Nulls and NaN are left out.
pub fn calculate_stats(series: &Series) -> Stats {
    let series_f64 = match series.cast(&DataType::Float64) {
        Ok(s) => s,
        Err(_) => return Stats::default(),
    };

    let chunked = match series_f64.f64() {
        Ok(c) => c,
        Err(_) => return Stats::default(),
    };

    let valid: Float64Chunked = chunked
        .into_iter()
        .filter(|opt| opt.is_some_and(|v| !v.is_nan()))
        .collect();

    let count = valid.len();
    if count == 0 {
        return Stats::default();
    }

    Stats {
        mean: valid.mean().unwrap_or(0.0),
        std_dev: valid.std(1).unwrap_or(0.0), // ddof=1 for sample std dev
        median: valid.median().unwrap_or(0.0),
        min: valid.min().unwrap_or(0.0),
        max: valid.max().unwrap_or(0.0),
        count,
    }
}

pub fn calculate_stats_vec(values: &[f64]) -> Stats {
    if values.is_empty() {
        return Stats::default();
    }

    let series = Series::new("values".into(), values);
    calculate_stats(&series)
}

/// Split `values` by `highlight` and describe each part
pub fn regime_stats(values: &[f64], highlight: &[bool]) -> Result<RegimeStats> {
    profiling::scope!("regime_stats");

    if values.len() != highlight.len() {
        return Err(LinkError::SizeMismatch {
            expected: highlight.len(),
            actual: values.len(),
        });
    }

    let series = Series::new("values".into(), values);
    let excluded: Vec<bool> = highlight.iter().map(|&hl| !hl).collect();
    let selected_mask = BooleanChunked::from_slice("selected".into(), highlight);
    let excluded_mask = BooleanChunked::from_slice("excluded".into(), &excluded);

    Ok(RegimeStats {
        all: calculate_stats(&series),
        selected: calculate_stats(&series.filter(&selected_mask)?),
        excluded: calculate_stats(&series.filter(&excluded_mask)?),
    })
}
