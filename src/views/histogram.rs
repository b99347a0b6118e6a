//! Histogram view model with equal-interval bins

use super::{LinkedView, ViewSummary, attach, check_len, detach};
use crate::constants::plot::MAX_HISTOGRAM_BINS;
use crate::data::stats::calculate_stats_vec;
use crate::data::{DataSource, SharedColumn, Stats};
use crate::error::{LinkError, Result};
use crate::highlight::{HighlightHub, HighlightObserver, HighlightState, ObserverId, SelectMode};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Serialize)]
pub struct HistogramSummary {
    pub title: String,
    pub column: String,
    pub intervals: Vec<(f64, f64)>,
    pub counts: Vec<usize>,
    pub selected_counts: Vec<usize>,
    pub total_selected: usize,
    pub stats: Stats,
    pub updates: usize,
}

pub struct HistogramView {
    hub: HighlightHub,
    observer_id: Option<ObserverId>,
    column: String,
    values: SharedColumn,
    bins: usize,
    min: f64,
    width: f64,
    /// Bin of each observation; non-finite values are not binned
    bin_of: Vec<Option<usize>>,
    bin_counts: Vec<usize>,
    selected_counts: Vec<usize>,
    total_selected: usize,
    update_count: usize,
}

impl HistogramView {
    pub fn open(
        hub: &HighlightHub,
        data: &DataSource,
        column: &str,
        bins: usize,
    ) -> Result<Rc<RefCell<Self>>> {
        let values = data.numeric_column(column)?;
        Self::from_column(hub, column, values, bins)
    }

    pub fn from_column(
        hub: &HighlightHub,
        column: &str,
        values: SharedColumn,
        bins: usize,
    ) -> Result<Rc<RefCell<Self>>> {
        if bins == 0 || bins > MAX_HISTOGRAM_BINS {
            return Err(LinkError::Config(format!(
                "histogram of '{}' needs 1 to {} bins, got {}",
                column, MAX_HISTOGRAM_BINS, bins
            )));
        }
        check_len(hub, values.len())?;

        let (min, max) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (min, width) = if min <= max {
            (min, (max - min) / bins as f64)
        } else {
            (0.0, 0.0)
        };

        let bin_of: Vec<Option<usize>> = values
            .iter()
            .map(|&v| {
                if !v.is_finite() {
                    None
                } else if width == 0.0 {
                    Some(0)
                } else {
                    Some((((v - min) / width).floor() as usize).min(bins - 1))
                }
            })
            .collect();

        let mut bin_counts = vec![0; bins];
        for bin in bin_of.iter().flatten() {
            bin_counts[*bin] += 1;
        }

        let view = Self {
            hub: hub.clone(),
            observer_id: None,
            column: column.to_string(),
            values,
            bins,
            min,
            width,
            bin_of,
            bin_counts,
            selected_counts: vec![0; bins],
            total_selected: 0,
            update_count: 0,
        };
        attach(hub, view, |view, id| view.observer_id = Some(id))
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Lower and upper bound of every interval
    pub fn intervals(&self) -> Vec<(f64, f64)> {
        (0..self.bins)
            .map(|i| {
                let lower = self.min + i as f64 * self.width;
                (lower, lower + self.width)
            })
            .collect()
    }

    pub fn bin_counts(&self) -> &[usize] {
        &self.bin_counts
    }

    pub fn selected_counts(&self) -> &[usize] {
        &self.selected_counts
    }

    pub fn total_selected(&self) -> usize {
        self.total_selected
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Observations falling in bins `first..=last`
    pub fn observations_in_bins(&self, first: usize, last: usize) -> Result<Vec<usize>> {
        for bin in [first, last] {
            if bin >= self.bins {
                return Err(LinkError::InvalidBin {
                    bin,
                    bins: self.bins,
                });
            }
        }
        let (lo, hi) = (first.min(last), first.max(last));
        Ok(self
            .bin_of
            .iter()
            .enumerate()
            .filter_map(|(i, bin)| bin.filter(|b| (lo..=hi).contains(b)).map(|_| i))
            .collect())
    }

    /// Brush whole intervals
    pub fn select_bins(&mut self, first: usize, last: usize, mode: SelectMode) -> Result<usize> {
        let hits = self.observations_in_bins(first, last)?;
        self.brush(&hits, mode)
    }
}

impl HighlightObserver for HistogramView {
    fn update(&mut self, state: &HighlightState) {
        if state.size() != self.bin_of.len() {
            log::warn!(
                "{}: ignoring selection over {} observations, histogram has {}",
                self.title(),
                state.size(),
                self.bin_of.len()
            );
            return;
        }

        self.selected_counts.fill(0);
        for (bin, _) in self
            .bin_of
            .iter()
            .zip(state.highlight())
            .filter(|&(_, &hl)| hl)
        {
            if let Some(bin) = bin {
                self.selected_counts[*bin] += 1;
            }
        }
        self.total_selected = state.total_highlighted();
        self.update_count += 1;
    }
}

impl LinkedView for HistogramView {
    fn hub(&self) -> &HighlightHub {
        &self.hub
    }

    fn observer_id(&self) -> Option<ObserverId> {
        self.observer_id
    }

    fn title(&self) -> String {
        format!("Histogram - {}", self.column)
    }

    fn summary(&self) -> ViewSummary {
        ViewSummary::Histogram(HistogramSummary {
            title: self.title(),
            column: self.column.clone(),
            intervals: self.intervals(),
            counts: self.bin_counts.clone(),
            selected_counts: self.selected_counts.clone(),
            total_selected: self.total_selected,
            stats: calculate_stats_vec(&self.values),
            updates: self.update_count,
        })
    }
}

impl Drop for HistogramView {
    fn drop(&mut self) {
        detach(&self.hub, self.observer_id, &self.title());
    }
}
