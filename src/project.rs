//! A loaded dataset, its highlight hub and the views opened on it

use crate::constants::plot::DEFAULT_HISTOGRAM_BINS;
use crate::data::DataSource;
use crate::error::{LinkError, Result};
use crate::highlight::HighlightHub;
use crate::views::{
    HistogramView, LinkedView, MatrixOptions, ScatterMatrix, ScatterOptions, ScatterView,
    ViewSummary,
};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

pub enum OpenView {
    Scatter(Rc<RefCell<ScatterView>>),
    Histogram(Rc<RefCell<HistogramView>>),
    Matrix(ScatterMatrix),
}

impl OpenView {
    pub fn summary(&self) -> ViewSummary {
        match self {
            OpenView::Scatter(view) => view.borrow().summary(),
            OpenView::Histogram(view) => view.borrow().summary(),
            OpenView::Matrix(matrix) => matrix.summary(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OpenView::Scatter(_) => "scatter",
            OpenView::Histogram(_) => "histogram",
            OpenView::Matrix(_) => "matrix",
        }
    }
}

/// Owns the hub for one dataset. Views hold clones of the hub handle.
pub struct Project {
    data: DataSource,
    hub: HighlightHub,
    /// Opening order
    views: Vec<(String, OpenView)>,
}

impl Project {
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(DataSource::load(path)?)
    }

    pub fn new(data: DataSource) -> Result<Self> {
        if data.height() == 0 {
            return Err(LinkError::EmptyDataset);
        }
        let hub = HighlightHub::new(data.height());
        Ok(Self {
            data,
            hub,
            views: Vec::new(),
        })
    }

    pub fn data(&self) -> &DataSource {
        &self.data
    }

    pub fn hub(&self) -> &HighlightHub {
        &self.hub
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if self.views.iter().any(|(n, _)| n == name) {
            return Err(LinkError::DuplicateView {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, view: OpenView) {
        log::info!("opened {} view '{}'", view.kind(), name);
        self.views.push((name.to_string(), view));
    }

    pub fn open_scatter(
        &mut self,
        name: &str,
        x: &str,
        y: &str,
        options: ScatterOptions,
    ) -> Result<Rc<RefCell<ScatterView>>> {
        self.check_name(name)?;
        let view = ScatterView::open(&self.hub, &self.data, x, y, options)?;
        self.insert(name, OpenView::Scatter(view.clone()));
        Ok(view)
    }

    pub fn open_histogram(
        &mut self,
        name: &str,
        column: &str,
        bins: Option<usize>,
    ) -> Result<Rc<RefCell<HistogramView>>> {
        self.check_name(name)?;
        let bins = bins.unwrap_or(DEFAULT_HISTOGRAM_BINS);
        let view = HistogramView::open(&self.hub, &self.data, column, bins)?;
        self.insert(name, OpenView::Histogram(view.clone()));
        Ok(view)
    }

    pub fn open_matrix(
        &mut self,
        name: &str,
        variables: &[String],
        options: MatrixOptions,
    ) -> Result<()> {
        self.check_name(name)?;
        let matrix = ScatterMatrix::open(&self.hub, &self.data, variables, options)?;
        self.insert(name, OpenView::Matrix(matrix));
        Ok(())
    }

    pub fn view(&self, name: &str) -> Result<&OpenView> {
        self.views
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, view)| view)
            .ok_or_else(|| LinkError::ViewNotFound {
                name: name.to_string(),
            })
    }

    /// Change the variables of an open scatter plot matrix
    pub fn set_matrix_variables(&mut self, name: &str, variables: &[String]) -> Result<()> {
        let data = &self.data;
        match self.views.iter_mut().find(|(n, _)| n == name) {
            Some((_, OpenView::Matrix(matrix))) => matrix.set_variables(data, variables),
            Some((_, other)) => Err(LinkError::Config(format!(
                "view '{}' is a {} view, not a matrix",
                name,
                other.kind()
            ))),
            None => Err(LinkError::ViewNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Close a view; it unregisters from the hub as it drops
    pub fn close_view(&mut self, name: &str) -> Result<()> {
        let pos = self
            .views
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| LinkError::ViewNotFound {
                name: name.to_string(),
            })?;
        let (_, view) = self.views.remove(pos);
        log::info!("closing {} view '{}'", view.kind(), name);
        Ok(())
    }

    pub fn view_names(&self) -> Vec<&str> {
        self.views.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn summaries(&self) -> Vec<(String, ViewSummary)> {
        self.views
            .iter()
            .map(|(n, view)| (n.clone(), view.summary()))
            .collect()
    }

    /// Swap in a new dataset. The hub is resized without notification and
    /// every open view is closed, since their columns no longer apply.
    pub fn replace_data(&mut self, data: DataSource) -> Result<()> {
        if data.height() == 0 {
            return Err(LinkError::EmptyDataset);
        }
        self.hub.set_size(data.height())?;
        let closed = self.views.len();
        self.views.clear();
        self.data = data;
        log::info!(
            "dataset replaced ({} observations), {} view(s) closed",
            self.data.height(),
            closed
        );
        Ok(())
    }

    /// Close the project. The hub is torn down once the last view is gone.
    pub fn close(mut self) -> Result<()> {
        self.hub.close_when_empty()?;
        self.views.clear();
        Ok(())
    }
}
