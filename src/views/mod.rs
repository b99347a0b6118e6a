//! Headless view models that observe the highlight hub
//!
//! A view re-derives its secondary state (selected counts, regime stats,
//! status text) from the shared selection. The view that originates a change
//! is excluded from the broadcast and refreshes itself directly.

pub mod histogram;
pub mod matrix;
pub mod scatter;

pub use histogram::{HistogramSummary, HistogramView};
pub use matrix::{CellSummary, MatrixCell, MatrixOptions, MatrixSummary, ScatterMatrix};
pub use scatter::{ScatterOptions, ScatterRegimes, ScatterSummary, ScatterView};

use crate::error::{LinkError, Result};
use crate::highlight::{HighlightHub, HighlightObserver, ObserverId, SelectMode};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Serializable snapshot of a view's derived state
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewSummary {
    Scatter(ScatterSummary),
    Histogram(HistogramSummary),
    Matrix(MatrixSummary),
}

/// A view registered on a highlight hub
pub trait LinkedView: HighlightObserver {
    fn hub(&self) -> &HighlightHub;

    fn observer_id(&self) -> Option<ObserverId>;

    fn title(&self) -> String;

    fn summary(&self) -> ViewSummary;

    /// Notify every other view, then refresh this one from the applied state
    fn broadcast(&mut self) -> Result<usize> {
        let hub = self.hub().clone();
        let notified = hub.notify(self.observer_id())?;
        hub.read(|state| self.update(state))?;
        Ok(notified)
    }

    /// Apply a brushing gesture originating in this view
    fn brush(&mut self, hits: &[usize], mode: SelectMode) -> Result<usize> {
        log::debug!("{}: brushing {} observation(s), {:?}", self.title(), hits.len(), mode);
        self.hub().edit(|state| state.select(hits, mode))??;
        self.broadcast()
    }

    fn unhighlight_all(&mut self) -> Result<usize> {
        self.hub().request_unhighlight_all()?;
        self.broadcast()
    }

    fn invert_selection(&mut self) -> Result<usize> {
        self.hub().request_invert()?;
        self.broadcast()
    }
}

/// Register a freshly built view and sync it with the current selection
pub(crate) fn attach<V>(
    hub: &HighlightHub,
    view: V,
    set_id: fn(&mut V, ObserverId),
) -> Result<Rc<RefCell<V>>>
where
    V: HighlightObserver + 'static,
{
    let view = Rc::new(RefCell::new(view));
    let id = hub.register_observer(&view)?;
    {
        let mut view = view.borrow_mut();
        set_id(&mut *view, id);
        hub.read(|state| view.update(state))?;
    }
    Ok(view)
}

/// Unregister on drop; a pruned observer or a closed hub is not an error here
pub(crate) fn detach(hub: &HighlightHub, id: Option<ObserverId>, title: &str) {
    let Some(id) = id else { return };
    match hub.remove_observer(id) {
        Ok(()) => log::debug!("{} detached", title),
        Err(LinkError::HubClosed | LinkError::UnknownObserver { .. }) => {}
        Err(e) => log::warn!("{} could not detach: {}", title, e),
    }
}

/// Validate that a column covers every observation of the hub
pub(crate) fn check_len(hub: &HighlightHub, len: usize) -> Result<()> {
    let expected = hub.size()?;
    if expected != len {
        return Err(LinkError::SizeMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}
