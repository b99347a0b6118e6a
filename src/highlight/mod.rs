//! Linked-brushing selection state
//!
//! [`HighlightState`] holds the membership vector and the deferred apply
//! step; [`HighlightHub`] shares it between views and broadcasts changes.

mod hub;
mod observer;
mod state;

pub use hub::HighlightHub;
pub use observer::{HighlightObserver, ObserverId};
pub use state::{EventType, HighlightState, SelectMode};
