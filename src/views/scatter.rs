//! Scatter plot view model
//!
//! Keeps the x/y columns of the plot and the state that depends on the
//! shared selection: the selected count, whether a LOWESS smoother may be
//! offered (only with no selection), per-regime statistics and the status
//! line.

use super::{LinkedView, ViewSummary, attach, check_len, detach};
use crate::data::stats::regime_stats;
use crate::data::{DataSource, RegimeStats, SharedColumn};
use crate::error::Result;
use crate::highlight::{HighlightHub, HighlightObserver, HighlightState, ObserverId, SelectMode};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

/// Scatter plot display options
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScatterOptions {
    /// Compute statistics separately for selected and excluded observations
    #[serde(default)]
    pub show_regimes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterRegimes {
    pub x: RegimeStats,
    pub y: RegimeStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterSummary {
    pub title: String,
    pub x: String,
    pub y: String,
    pub total_selected: usize,
    pub lowess_enabled: bool,
    pub regimes: Option<ScatterRegimes>,
    pub status: String,
    pub updates: usize,
}

pub struct ScatterView {
    hub: HighlightHub,
    observer_id: Option<ObserverId>,
    x_name: String,
    y_name: String,
    x: SharedColumn,
    y: SharedColumn,
    options: ScatterOptions,
    total_selected: usize,
    lowess_enabled: bool,
    regimes: Option<ScatterRegimes>,
    hover_obs: Option<usize>,
    update_count: usize,
}

impl ScatterView {
    /// Open a scatter plot of two dataset columns
    pub fn open(
        hub: &HighlightHub,
        data: &DataSource,
        x: &str,
        y: &str,
        options: ScatterOptions,
    ) -> Result<Rc<RefCell<Self>>> {
        let x_values = data.numeric_column(x)?;
        let y_values = data.numeric_column(y)?;
        Self::from_columns(hub, x, x_values, y, y_values, options)
    }

    pub fn from_columns(
        hub: &HighlightHub,
        x_name: &str,
        x: SharedColumn,
        y_name: &str,
        y: SharedColumn,
        options: ScatterOptions,
    ) -> Result<Rc<RefCell<Self>>> {
        check_len(hub, x.len())?;
        check_len(hub, y.len())?;

        let view = Self {
            hub: hub.clone(),
            observer_id: None,
            x_name: x_name.to_string(),
            y_name: y_name.to_string(),
            x,
            y,
            options,
            total_selected: 0,
            lowess_enabled: true,
            regimes: None,
            hover_obs: None,
            update_count: 0,
        };
        attach(hub, view, |view, id| view.observer_id = Some(id))
    }

    pub fn total_selected(&self) -> usize {
        self.total_selected
    }

    pub fn lowess_enabled(&self) -> bool {
        self.lowess_enabled
    }

    pub fn regimes(&self) -> Option<&ScatterRegimes> {
        self.regimes.as_ref()
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Toggle per-regime statistics and recompute them from the hub
    pub fn set_show_regimes(&mut self, show: bool) -> Result<()> {
        self.options.show_regimes = show;
        let hub = self.hub.clone();
        hub.read(|state| self.update(state))
    }

    /// Observations inside the rectangle spanned by two corners (inclusive)
    pub fn points_in_rect(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<usize> {
        let (x_min, x_max) = (x0.min(x1), x0.max(x1));
        let (y_min, y_max) = (y0.min(y1), y0.max(y1));
        self.x
            .iter()
            .zip(self.y.iter())
            .enumerate()
            .filter(|&(_, (&x, &y))| x >= x_min && x <= x_max && y >= y_min && y <= y_max)
            .map(|(i, _)| i)
            .collect()
    }

    /// Closest observation within `tolerance` of (x, y)
    pub fn nearest_point(&self, x: f64, y: f64, tolerance: f64) -> Option<usize> {
        self.x
            .iter()
            .zip(self.y.iter())
            .enumerate()
            .filter(|(_, (px, py))| !px.is_nan() && !py.is_nan())
            .map(|(i, (px, py))| (i, (px - x).hypot(py - y)))
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Rectangle brush
    pub fn select_rect(
        &mut self,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        mode: SelectMode,
    ) -> Result<usize> {
        let hits = self.points_in_rect(x0, y0, x1, y1);
        self.brush(&hits, mode)
    }

    /// Click selection; clicking empty space with a new selection clears it
    pub fn select_point(&mut self, x: f64, y: f64, tolerance: f64, mode: SelectMode) -> Result<usize> {
        let hits: Vec<usize> = self.nearest_point(x, y, tolerance).into_iter().collect();
        self.brush(&hits, mode)
    }

    pub fn hover(&mut self, x: f64, y: f64, tolerance: f64) -> Option<usize> {
        self.hover_obs = self.nearest_point(x, y, tolerance);
        self.hover_obs
    }

    pub fn status_text(&self) -> String {
        let mut s = String::new();
        if self.total_selected > 0 {
            let _ = write!(s, "#selected={}  ", self.total_selected);
        }
        if let Some(i) = self.hover_obs {
            let _ = write!(s, "hover obs {} = ({}, {})", i + 1, self.x[i], self.y[i]);
        }
        s
    }

    fn compute_regimes(&self, highlight: &[bool]) -> Option<ScatterRegimes> {
        match (
            regime_stats(&self.x, highlight),
            regime_stats(&self.y, highlight),
        ) {
            (Ok(x), Ok(y)) => Some(ScatterRegimes { x, y }),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("{}: regime statistics unavailable: {}", self.title(), e);
                None
            }
        }
    }
}

impl HighlightObserver for ScatterView {
    fn update(&mut self, state: &HighlightState) {
        if state.size() != self.x.len() {
            log::warn!(
                "{}: ignoring selection over {} observations, plot has {}",
                self.title(),
                state.size(),
                self.x.len()
            );
            return;
        }

        self.total_selected = state.total_highlighted();
        self.lowess_enabled = self.total_selected == 0;
        self.regimes = if self.options.show_regimes {
            self.compute_regimes(state.highlight())
        } else {
            None
        };
        self.update_count += 1;
    }
}

impl LinkedView for ScatterView {
    fn hub(&self) -> &HighlightHub {
        &self.hub
    }

    fn observer_id(&self) -> Option<ObserverId> {
        self.observer_id
    }

    fn title(&self) -> String {
        format!("Scatter Plot - x: {}, y: {}", self.x_name, self.y_name)
    }

    fn summary(&self) -> ViewSummary {
        ViewSummary::Scatter(ScatterSummary {
            title: self.title(),
            x: self.x_name.clone(),
            y: self.y_name.clone(),
            total_selected: self.total_selected,
            lowess_enabled: self.lowess_enabled,
            regimes: self.regimes,
            status: self.status_text(),
            updates: self.update_count,
        })
    }
}

impl Drop for ScatterView {
    fn drop(&mut self) {
        detach(&self.hub, self.observer_id, &self.title());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn scatter(hub: &HighlightHub, options: ScatterOptions) -> Rc<RefCell<ScatterView>> {
        let x: SharedColumn = Arc::from(&[0.0, 1.0, 2.0, 3.0, f64::NAN][..]);
        let y: SharedColumn = Arc::from(&[0.0, 10.0, 20.0, 30.0, 40.0][..]);
        ScatterView::from_columns(hub, "pop", x, "crime", y, options).unwrap()
    }

    #[test]
    fn test_rect_corners_in_any_order() {
        let hub = HighlightHub::new(5);
        let view = scatter(&hub, ScatterOptions::default());
        let view = view.borrow();

        assert_eq!(view.points_in_rect(0.5, 5.0, 2.0, 25.0), vec![1, 2]);
        assert_eq!(view.points_in_rect(2.0, 25.0, 0.5, 5.0), vec![1, 2]);
        // NaN x never falls inside
        assert_eq!(view.points_in_rect(-100.0, 35.0, 100.0, 45.0), Vec::<usize>::new());
    }

    #[test]
    fn test_lowess_only_without_selection() {
        let hub = HighlightHub::new(5);
        let view = scatter(&hub, ScatterOptions::default());
        assert!(view.borrow().lowess_enabled());

        view.borrow_mut()
            .select_rect(0.0, 0.0, 1.0, 10.0, SelectMode::New)
            .unwrap();
        assert!(!view.borrow().lowess_enabled());
        assert_eq!(view.borrow().total_selected(), 2);

        view.borrow_mut().unhighlight_all().unwrap();
        assert!(view.borrow().lowess_enabled());
        assert_eq!(hub.total_highlighted().unwrap(), 0);
    }

    #[test]
    fn test_regimes_follow_selection() {
        let hub = HighlightHub::new(5);
        let view = scatter(&hub, ScatterOptions { show_regimes: true });

        view.borrow_mut()
            .select_rect(2.0, 0.0, 3.0, 100.0, SelectMode::New)
            .unwrap();
        let view = view.borrow();
        let regimes = view.regimes().unwrap();
        assert_eq!(regimes.y.selected.count, 2);
        assert_eq!(regimes.y.selected.mean, 25.0);
        assert_eq!(regimes.y.excluded.count, 3);
        assert_eq!(regimes.y.excluded.mean, (0.0 + 10.0 + 40.0) / 3.0);
        // the NaN x value sits in the excluded regime and is skipped
        assert_eq!(regimes.x.excluded.count, 2);
    }

    #[test]
    fn test_regimes_toggle() {
        let hub = HighlightHub::new(5);
        let view = scatter(&hub, ScatterOptions::default());
        assert!(view.borrow().regimes().is_none());

        view.borrow_mut().set_show_regimes(true).unwrap();
        assert_eq!(view.borrow().regimes().unwrap().y.all.count, 5);
    }

    #[test]
    fn test_point_click_and_status() {
        let hub = HighlightHub::new(5);
        let view = scatter(&hub, ScatterOptions::default());

        view.borrow_mut()
            .select_point(1.1, 10.0, 0.5, SelectMode::New)
            .unwrap();
        assert_eq!(hub.highlighted_indices().unwrap(), vec![1]);

        view.borrow_mut()
            .select_point(3.0, 30.0, 0.5, SelectMode::Add)
            .unwrap();
        assert_eq!(hub.highlighted_indices().unwrap(), vec![1, 3]);

        assert_eq!(view.borrow_mut().hover(2.0, 20.0, 0.1), Some(2));
        assert_eq!(view.borrow().status_text(), "#selected=2  hover obs 3 = (2, 20)");

        // click on empty space clears
        view.borrow_mut()
            .select_point(50.0, 50.0, 0.5, SelectMode::New)
            .unwrap();
        assert_eq!(hub.total_highlighted().unwrap(), 0);
    }

    #[test]
    fn test_title() {
        let hub = HighlightHub::new(5);
        let view = scatter(&hub, ScatterOptions::default());
        assert_eq!(view.borrow().title(), "Scatter Plot - x: pop, y: crime");
    }
}
