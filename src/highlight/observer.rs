use super::state::HighlightState;
use std::fmt;

/// Receives a read-only view of the hub state after every applied change
pub trait HighlightObserver {
    fn update(&mut self, state: &HighlightState);
}

/// Handle returned by registration, used to unregister or to exclude the
/// originating view from a notification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub(crate) u64);

impl ObserverId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
