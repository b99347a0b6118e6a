//! Scatter plot matrix
//!
//! A k x k grid over k variables. Diagonal cells are histograms of the
//! variable, cell (row, col) elsewhere plots x = variable `col` against
//! y = variable `row`. Every cell observes the hub on its own, so brushing
//! one cell updates the rest of the grid like any other linked view.

use super::{HistogramView, LinkedView, ScatterOptions, ScatterView, ViewSummary};
use crate::constants::plot::DEFAULT_HISTOGRAM_BINS;
use crate::data::{DataSource, SharedColumn};
use crate::error::{LinkError, Result};
use crate::highlight::HighlightHub;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixOptions {
    #[serde(default)]
    pub show_regimes: bool,
    #[serde(default = "default_bins")]
    pub bins: usize,
}

fn default_bins() -> usize {
    DEFAULT_HISTOGRAM_BINS
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            show_regimes: false,
            bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

pub enum MatrixCell {
    Histogram(Rc<RefCell<HistogramView>>),
    Scatter(Rc<RefCell<ScatterView>>),
}

impl MatrixCell {
    pub fn summary(&self) -> ViewSummary {
        match self {
            MatrixCell::Histogram(view) => view.borrow().summary(),
            MatrixCell::Scatter(view) => view.borrow().summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CellSummary {
    pub row: usize,
    pub col: usize,
    pub view: ViewSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixSummary {
    pub title: String,
    pub variables: Vec<String>,
    pub total_selected: usize,
    pub cells: Vec<CellSummary>,
}

pub struct ScatterMatrix {
    hub: HighlightHub,
    variables: Vec<String>,
    options: MatrixOptions,
    /// Row-major
    cells: Vec<MatrixCell>,
}

impl ScatterMatrix {
    pub fn open(
        hub: &HighlightHub,
        data: &DataSource,
        variables: &[String],
        options: MatrixOptions,
    ) -> Result<Self> {
        let mut matrix = Self {
            hub: hub.clone(),
            variables: Vec::new(),
            options,
            cells: Vec::new(),
        };
        matrix.set_variables(data, variables)?;
        Ok(matrix)
    }

    /// Rebuild the grid for a new variable list. The new cells are registered
    /// before the old ones drop and detach; on error the old grid is kept.
    pub fn set_variables(&mut self, data: &DataSource, variables: &[String]) -> Result<()> {
        if variables.is_empty() {
            return Err(LinkError::Config(
                "scatter plot matrix needs at least one variable".to_string(),
            ));
        }
        let columns = variables
            .iter()
            .map(|name| data.numeric_column(name))
            .collect::<Result<Vec<SharedColumn>>>()?;

        let scatter_options = ScatterOptions {
            show_regimes: self.options.show_regimes,
        };
        let k = variables.len();
        let mut cells = Vec::with_capacity(k * k);
        for row in 0..k {
            for col in 0..k {
                let cell = if row == col {
                    MatrixCell::Histogram(HistogramView::from_column(
                        &self.hub,
                        &variables[row],
                        columns[row].clone(),
                        self.options.bins,
                    )?)
                } else {
                    MatrixCell::Scatter(ScatterView::from_columns(
                        &self.hub,
                        &variables[col],
                        columns[col].clone(),
                        &variables[row],
                        columns[row].clone(),
                        scatter_options,
                    )?)
                };
                cells.push(cell);
            }
        }
        self.cells = cells;
        self.variables = variables.to_vec();
        log::debug!("scatter plot matrix over {} variable(s)", k);
        Ok(())
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Number of rows (and columns)
    pub fn size(&self) -> usize {
        self.variables.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<&MatrixCell> {
        let size = self.size();
        if row >= size || col >= size {
            return Err(LinkError::InvalidCell { row, col, size });
        }
        self.cells
            .get(row * size + col)
            .ok_or(LinkError::InvalidCell { row, col, size })
    }

    pub fn title(&self) -> String {
        "Scatter Plot Matrix".to_string()
    }

    pub fn summary(&self) -> ViewSummary {
        let size = self.size();
        ViewSummary::Matrix(MatrixSummary {
            title: self.title(),
            variables: self.variables.clone(),
            total_selected: self.hub.total_highlighted().unwrap_or(0),
            cells: self
                .cells
                .iter()
                .enumerate()
                .map(|(i, cell)| CellSummary {
                    row: i / size,
                    col: i % size,
                    view: cell.summary(),
                })
                .collect(),
        })
    }
}
