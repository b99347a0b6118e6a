//! Selection membership and the deferred apply step

use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation queued by the last request, consumed by [`HighlightState::apply_changes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    Empty,
    Delta,
    UnhighlightAll,
    Invert,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Empty => "empty",
            EventType::Delta => "delta",
            EventType::UnhighlightAll => "unhighlight_all",
            EventType::Invert => "invert",
        };
        f.write_str(s)
    }
}

/// How a brushing gesture combines with the existing selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    /// Replace the selection with the hits
    #[default]
    New,
    /// Add the hits to the selection
    Add,
}

/// Boolean membership over a fixed universe of observations.
///
/// Callers that need point mutations edit [`highlight_mut`](Self::highlight_mut)
/// and then call [`request_delta`](Self::request_delta); the cached total is
/// only trustworthy again after the next apply.
#[derive(Debug, Clone, Default)]
pub struct HighlightState {
    highlight: Vec<bool>,
    total_highlighted: usize,
    event_type: EventType,
}

impl HighlightState {
    /// Create a state over `size` observations, none selected
    pub fn new(size: usize) -> Self {
        let mut state = Self::default();
        state.set_size(size);
        state
    }

    /// Reinitialize to `size` unselected observations
    pub fn set_size(&mut self, size: usize) {
        self.highlight.clear();
        self.highlight.resize(size, false);
        self.total_highlighted = 0;
    }

    pub fn size(&self) -> usize {
        self.highlight.len()
    }

    pub fn highlight(&self) -> &[bool] {
        &self.highlight
    }

    pub fn highlight_mut(&mut self) -> &mut [bool] {
        &mut self.highlight
    }

    /// Out-of-range indices read as unselected
    pub fn is_highlighted(&self, index: usize) -> bool {
        self.highlight.get(index).copied().unwrap_or(false)
    }

    /// Set one entry; returns whether it changed
    pub fn set_highlighted(&mut self, index: usize, value: bool) -> Result<bool> {
        let size = self.size();
        let slot = self
            .highlight
            .get_mut(index)
            .ok_or(LinkError::ObservationOutOfRange { index, size })?;
        let changed = *slot != value;
        *slot = value;
        Ok(changed)
    }

    pub fn total_highlighted(&self) -> usize {
        self.total_highlighted
    }

    pub fn total_unhighlighted(&self) -> usize {
        self.size() - self.total_highlighted
    }

    pub fn highlighted_indices(&self) -> Vec<usize> {
        self.highlight
            .iter()
            .enumerate()
            .filter_map(|(i, &hl)| hl.then_some(i))
            .collect()
    }

    /// Edit membership for a brushing gesture and queue the matching event.
    /// A new selection with no hits becomes an unhighlight-all request.
    /// Nothing is changed if any index is out of range.
    pub fn select(&mut self, hits: &[usize], mode: SelectMode) -> Result<()> {
        let size = self.size();
        if let Some(&index) = hits.iter().find(|&&i| i >= size) {
            return Err(LinkError::ObservationOutOfRange { index, size });
        }

        match mode {
            SelectMode::New if hits.is_empty() => {
                self.request_unhighlight_all();
                return Ok(());
            }
            SelectMode::New => self.highlight.fill(false),
            SelectMode::Add => {}
        }
        for &i in hits {
            self.highlight[i] = true;
        }
        self.request_delta();
        Ok(())
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn request_delta(&mut self) {
        self.queue(EventType::Delta);
    }

    pub fn request_unhighlight_all(&mut self) {
        self.queue(EventType::UnhighlightAll);
    }

    pub fn request_invert(&mut self) {
        self.queue(EventType::Invert);
    }

    fn queue(&mut self, event: EventType) {
        debug_assert!(
            self.event_type == EventType::Empty,
            "{} requested while {} is still pending",
            event,
            self.event_type
        );
        if self.event_type != EventType::Empty {
            log::warn!(
                "discarding unapplied {} event, {} requested",
                self.event_type,
                event
            );
        }
        self.event_type = event;
    }

    /// Apply the pending operation and return it; the pending slot is reset.
    pub fn apply_changes(&mut self) -> EventType {
        profiling::scope!("HighlightState::apply_changes");

        let event = std::mem::take(&mut self.event_type);
        match event {
            EventType::Delta => {
                self.total_highlighted = self.highlight.iter().filter(|&&hl| hl).count();
            }
            EventType::UnhighlightAll => {
                self.highlight.fill(false);
                self.total_highlighted = 0;
            }
            EventType::Invert => {
                let mut total = 0;
                for hl in self.highlight.iter_mut() {
                    *hl = !*hl;
                    total += usize::from(*hl);
                }
                self.total_highlighted = total;
            }
            EventType::Empty => {}
        }
        event
    }
}
