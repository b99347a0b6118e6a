//! Session files: a dataset, the views to open on it and a scripted
//! sequence of brushing actions replayed against the shared selection.

use crate::constants::plot::POINT_SELECT_TOLERANCE;
use crate::error::{LinkError, Result};
use crate::highlight::{EventType, SelectMode};
use crate::project::{OpenView, Project};
use crate::views::{
    HistogramView, LinkedView, MatrixCell, MatrixOptions, ScatterOptions, ScatterView, ViewSummary,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

fn default_tolerance() -> f64 {
    POINT_SELECT_TOLERANCE
}

/// A view to open when the session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewSpec {
    Scatter {
        name: String,
        x: String,
        y: String,
        #[serde(default)]
        show_regimes: bool,
    },
    Histogram {
        name: String,
        column: String,
        #[serde(default)]
        bins: Option<usize>,
    },
    Matrix {
        name: String,
        variables: Vec<String>,
        #[serde(default)]
        show_regimes: bool,
        #[serde(default)]
        bins: Option<usize>,
    },
}

/// One scripted user gesture. Views inside a matrix are addressed with
/// `cell: [row, col]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BrushAction {
    SelectRect {
        view: String,
        #[serde(default)]
        cell: Option<[usize; 2]>,
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
        #[serde(default)]
        mode: SelectMode,
    },
    SelectPoint {
        view: String,
        #[serde(default)]
        cell: Option<[usize; 2]>,
        x: f64,
        y: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default)]
        mode: SelectMode,
    },
    SelectBins {
        view: String,
        #[serde(default)]
        cell: Option<[usize; 2]>,
        first: usize,
        last: usize,
        #[serde(default)]
        mode: SelectMode,
    },
    /// Direct membership edit followed by a delta request. With an `origin`
    /// the named view is left out of the broadcast and refreshes itself.
    SelectObservations {
        #[serde(default)]
        origin: Option<String>,
        indices: Vec<usize>,
        #[serde(default)]
        mode: SelectMode,
    },
    UnhighlightAll {
        #[serde(default)]
        view: Option<String>,
    },
    Invert {
        #[serde(default)]
        view: Option<String>,
    },
}

impl BrushAction {
    pub fn op(&self) -> &'static str {
        match self {
            BrushAction::SelectRect { .. } => "select_rect",
            BrushAction::SelectPoint { .. } => "select_point",
            BrushAction::SelectBins { .. } => "select_bins",
            BrushAction::SelectObservations { .. } => "select_observations",
            BrushAction::UnhighlightAll { .. } => "unhighlight_all",
            BrushAction::Invert { .. } => "invert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// CSV or Parquet file; relative paths resolve against the session file
    pub dataset: PathBuf,
    #[serde(default)]
    pub views: Vec<ViewSpec>,
    #[serde(default)]
    pub actions: Vec<BrushAction>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(dataset: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            views: Vec::new(),
            actions: Vec::new(),
            base_dir: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: SessionConfig = serde_json::from_str(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        log::debug!(
            "loaded session {} ({} view(s), {} action(s))",
            path.display(),
            config.views.len(),
            config.actions.len()
        );
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn dataset_path(&self) -> PathBuf {
        match &self.base_dir {
            Some(base) if self.dataset.is_relative() => base.join(&self.dataset),
            _ => self.dataset.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 1-based position in the action list
    pub step: usize,
    pub op: &'static str,
    pub event: EventType,
    pub notified: usize,
    pub total_selected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedSummary {
    pub name: String,
    pub view: ViewSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub dataset: String,
    pub observations: usize,
    pub steps: Vec<StepReport>,
    pub views: Vec<NamedSummary>,
    pub selected: Vec<usize>,
}

/// The view an action is aimed at
enum Target {
    Scatter(Rc<RefCell<ScatterView>>),
    Histogram(Rc<RefCell<HistogramView>>),
}

impl Target {
    fn kind(&self) -> &'static str {
        match self {
            Target::Scatter(_) => "scatter",
            Target::Histogram(_) => "histogram",
        }
    }

    fn with_view<R>(&self, f: impl FnOnce(&mut dyn LinkedView) -> R) -> R {
        match self {
            Target::Scatter(view) => f(&mut *view.borrow_mut()),
            Target::Histogram(view) => f(&mut *view.borrow_mut()),
        }
    }
}

pub struct Session {
    project: Project,
    steps: Vec<StepReport>,
}

impl Session {
    /// Load the dataset and open every configured view
    pub fn start(config: &SessionConfig) -> Result<Self> {
        let path = config.dataset_path();
        let mut project = crate::timed!("load dataset", Project::open(&path))?;

        for view in &config.views {
            match view {
                ViewSpec::Scatter {
                    name,
                    x,
                    y,
                    show_regimes,
                } => {
                    let options = ScatterOptions {
                        show_regimes: *show_regimes,
                    };
                    project.open_scatter(name, x, y, options)?;
                }
                ViewSpec::Histogram { name, column, bins } => {
                    project.open_histogram(name, column, *bins)?;
                }
                ViewSpec::Matrix {
                    name,
                    variables,
                    show_regimes,
                    bins,
                } => {
                    let mut options = MatrixOptions {
                        show_regimes: *show_regimes,
                        ..Default::default()
                    };
                    if let Some(bins) = bins {
                        options.bins = *bins;
                    }
                    project.open_matrix(name, variables, options)?;
                }
            }
        }

        Ok(Self {
            project,
            steps: Vec::new(),
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    fn target(&self, view: &str, cell: Option<[usize; 2]>) -> Result<Target> {
        match (self.project.view(view)?, cell) {
            (OpenView::Scatter(v), None) => Ok(Target::Scatter(v.clone())),
            (OpenView::Histogram(v), None) => Ok(Target::Histogram(v.clone())),
            (OpenView::Matrix(matrix), Some([row, col])) => match matrix.cell(row, col)? {
                MatrixCell::Scatter(v) => Ok(Target::Scatter(v.clone())),
                MatrixCell::Histogram(v) => Ok(Target::Histogram(v.clone())),
            },
            (OpenView::Matrix(_), None) => Err(LinkError::Config(format!(
                "view '{}' is a matrix, actions on it need a cell",
                view
            ))),
            (other, Some(_)) => Err(LinkError::Config(format!(
                "view '{}' is a {} view and has no cells",
                view,
                other.kind()
            ))),
        }
    }

    fn wrong_kind(view: &str, target: &Target, expected: &str) -> LinkError {
        LinkError::Config(format!(
            "view '{}' is a {} view, expected {}",
            view,
            target.kind(),
            expected
        ))
    }

    /// Replay one action and record what the hub did
    pub fn apply(&mut self, action: &BrushAction) -> Result<StepReport> {
        profiling::scope!("Session::apply");
        let step = self.steps.len() + 1;
        log::debug!("step {}: {}", step, action.op());

        let notified = match action {
            BrushAction::SelectRect {
                view,
                cell,
                x_min,
                y_min,
                x_max,
                y_max,
                mode,
            } => match self.target(view, *cell)? {
                Target::Scatter(v) => v
                    .borrow_mut()
                    .select_rect(*x_min, *y_min, *x_max, *y_max, *mode)?,
                other => return Err(Self::wrong_kind(view, &other, "a scatter plot")),
            },
            BrushAction::SelectPoint {
                view,
                cell,
                x,
                y,
                tolerance,
                mode,
            } => match self.target(view, *cell)? {
                Target::Scatter(v) => v.borrow_mut().select_point(*x, *y, *tolerance, *mode)?,
                other => return Err(Self::wrong_kind(view, &other, "a scatter plot")),
            },
            BrushAction::SelectBins {
                view,
                cell,
                first,
                last,
                mode,
            } => match self.target(view, *cell)? {
                Target::Histogram(v) => v.borrow_mut().select_bins(*first, *last, *mode)?,
                other => return Err(Self::wrong_kind(view, &other, "a histogram")),
            },
            BrushAction::SelectObservations {
                origin,
                indices,
                mode,
            } => match origin {
                Some(name) => self
                    .target(name, None)?
                    .with_view(|v| v.brush(indices, *mode))?,
                None => {
                    let hub = self.project.hub();
                    hub.edit(|state| state.select(indices, *mode))??;
                    hub.notify(None)?
                }
            },
            BrushAction::UnhighlightAll { view } => match view {
                Some(name) => self
                    .target(name, None)?
                    .with_view(|v| v.unhighlight_all())?,
                None => {
                    let hub = self.project.hub();
                    hub.request_unhighlight_all()?;
                    hub.notify(None)?
                }
            },
            BrushAction::Invert { view } => match view {
                Some(name) => self
                    .target(name, None)?
                    .with_view(|v| v.invert_selection())?,
                None => {
                    let hub = self.project.hub();
                    hub.request_invert()?;
                    hub.notify(None)?
                }
            },
        };

        let hub = self.project.hub();
        let report = StepReport {
            step,
            op: action.op(),
            event: hub.last_event()?,
            notified,
            total_selected: hub.total_highlighted()?,
        };
        self.steps.push(report.clone());
        profiling::finish_frame!();
        Ok(report)
    }

    pub fn report(&self) -> Result<SessionReport> {
        let data = self.project.data();
        Ok(SessionReport {
            dataset: data
                .file_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            observations: data.height(),
            steps: self.steps.clone(),
            views: self
                .project
                .summaries()
                .into_iter()
                .map(|(name, view)| NamedSummary { name, view })
                .collect(),
            selected: self.project.hub().highlighted_indices()?,
        })
    }

    /// Close every view and tear down the selection state
    pub fn close(self) -> Result<()> {
        self.project.close()
    }

    /// Replay a whole session and report the final state
    pub fn run(config: &SessionConfig) -> Result<SessionReport> {
        let mut session = Self::start(config)?;
        for action in &config.actions {
            session.apply(action)?;
        }
        let report = session.report()?;
        session.close()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const CSV: &str = "\
county,pop,crime,income
a,120,3.0,40
b,80,1.0,55
c,310,9.0,30
d,45,0.5,70
e,200,4.0,45
f,150,6.0,38
";

    fn write_dataset(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("counties.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        path
    }

    fn config(dataset: PathBuf) -> SessionConfig {
        let mut config = SessionConfig::new(dataset);
        config.views = vec![
            ViewSpec::Scatter {
                name: "scatter".to_string(),
                x: "pop".to_string(),
                y: "crime".to_string(),
                show_regimes: true,
            },
            ViewSpec::Histogram {
                name: "hist".to_string(),
                column: "income".to_string(),
                bins: Some(4),
            },
        ];
        config
    }

    #[test]
    fn test_replay_totals() {
        let dir = TempDir::new().unwrap();
        let mut config = config(write_dataset(&dir));
        config.actions = vec![
            BrushAction::SelectRect {
                view: "scatter".to_string(),
                cell: None,
                x_min: 100.0,
                y_min: 0.0,
                x_max: 400.0,
                y_max: 5.0,
                mode: SelectMode::New,
            },
            BrushAction::SelectObservations {
                origin: None,
                indices: vec![3],
                mode: SelectMode::Add,
            },
            BrushAction::Invert {
                view: Some("hist".to_string()),
            },
            BrushAction::UnhighlightAll { view: None },
        ];

        let report = Session::run(&config).unwrap();
        assert_eq!(report.observations, 6);

        let totals: Vec<usize> = report.steps.iter().map(|s| s.total_selected).collect();
        assert_eq!(totals, vec![2, 3, 3, 0]);
        let events: Vec<EventType> = report.steps.iter().map(|s| s.event).collect();
        assert_eq!(
            events,
            vec![
                EventType::Delta,
                EventType::Delta,
                EventType::Invert,
                EventType::UnhighlightAll
            ]
        );
        // originating view is excluded, a script-level action reaches both
        let notified: Vec<usize> = report.steps.iter().map(|s| s.notified).collect();
        assert_eq!(notified, vec![1, 2, 1, 2]);
        assert!(report.selected.is_empty());
    }

    #[test]
    fn test_step_by_step_view_state() {
        let dir = TempDir::new().unwrap();
        let config = config(write_dataset(&dir));
        let mut session = Session::start(&config).unwrap();

        session
            .apply(&BrushAction::SelectBins {
                view: "hist".to_string(),
                cell: None,
                first: 0,
                last: 0,
                mode: SelectMode::New,
            })
            .unwrap();
        // first of four 10-wide bins over income 30..70: c and f
        assert_eq!(session.project().hub().highlighted_indices().unwrap(), vec![2, 5]);

        let OpenView::Scatter(scatter) = session.project().view("scatter").unwrap() else {
            panic!("expected scatter view");
        };
        let scatter = scatter.borrow();
        assert_eq!(scatter.total_selected(), 2);
        assert!(!scatter.lowess_enabled());
        let regimes = scatter.regimes().unwrap();
        assert_eq!(regimes.y.selected.mean, 7.5);
        assert_eq!(regimes.y.excluded.count, 4);
    }

    #[test]
    fn test_matrix_cells_are_addressable() {
        let dir = TempDir::new().unwrap();
        let mut config = SessionConfig::new(write_dataset(&dir));
        config.views = vec![ViewSpec::Matrix {
            name: "m".to_string(),
            variables: vec!["pop".to_string(), "crime".to_string()],
            show_regimes: false,
            bins: None,
        }];
        let mut session = Session::start(&config).unwrap();

        let step = session
            .apply(&BrushAction::SelectRect {
                view: "m".to_string(),
                cell: Some([1, 0]),
                x_min: 0.0,
                y_min: 0.0,
                x_max: 100.0,
                y_max: 10.0,
                mode: SelectMode::New,
            })
            .unwrap();
        assert_eq!(step.total_selected, 2);
        assert_eq!(step.notified, 3);

        let missing_cell = BrushAction::SelectPoint {
            view: "m".to_string(),
            cell: None,
            x: 0.0,
            y: 0.0,
            tolerance: POINT_SELECT_TOLERANCE,
            mode: SelectMode::New,
        };
        assert!(matches!(
            session.apply(&missing_cell),
            Err(LinkError::Config(_))
        ));
        let histogram_cell = BrushAction::SelectRect {
            view: "m".to_string(),
            cell: Some([0, 0]),
            x_min: 0.0,
            y_min: 0.0,
            x_max: 1.0,
            y_max: 1.0,
            mode: SelectMode::New,
        };
        assert!(matches!(
            session.apply(&histogram_cell),
            Err(LinkError::Config(_))
        ));
        assert_eq!(session.steps().len(), 1);
    }

    #[test]
    fn test_session_file_round_trip_and_relative_dataset() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir);
        let json = r#"{
            "dataset": "counties.csv",
            "views": [
                {"kind": "histogram", "name": "h", "column": "pop"}
            ],
            "actions": [
                {"op": "select_bins", "view": "h", "first": 0, "last": 6},
                {"op": "select_point", "view": "h", "x": 1.0, "y": 1.0}
            ]
        }"#;
        let path = dir.path().join("session.json");
        std::fs::write(&path, json).unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.dataset_path(), dir.path().join("counties.csv"));
        match &config.actions[1] {
            BrushAction::SelectPoint {
                tolerance, mode, ..
            } => {
                assert_eq!(*tolerance, POINT_SELECT_TOLERANCE);
                assert_eq!(*mode, SelectMode::New);
            }
            other => panic!("unexpected action {:?}", other),
        }

        let saved = dir.path().join("saved.json");
        config.save(&saved).unwrap();
        let reloaded = SessionConfig::load(&saved).unwrap();
        assert_eq!(reloaded.views, config.views);
        assert_eq!(reloaded.actions, config.actions);

        let mut session = Session::start(&config).unwrap();
        let step = session.apply(&config.actions[0]).unwrap();
        assert_eq!(step.total_selected, 6);
        assert_eq!(step.notified, 0);
        // point selection is for scatter plots
        assert!(session.apply(&config.actions[1]).is_err());
    }

    #[test]
    fn test_unknown_view_and_bad_dataset() {
        let dir = TempDir::new().unwrap();
        let mut config = config(write_dataset(&dir));
        config.actions = vec![BrushAction::Invert {
            view: Some("nope".to_string()),
        }];
        assert!(matches!(
            Session::run(&config),
            Err(LinkError::ViewNotFound { .. })
        ));

        let config = SessionConfig::new(dir.path().join("counties.xlsx"));
        assert!(matches!(
            Session::run(&config),
            Err(LinkError::UnsupportedFormat { .. })
        ));
    }
}
