//! Defines all public event types broadcast by the world clock engine.
//!
//! Front-ends subscribe to these strongly-typed streams instead of polling the
//! engine. Rendered frames travel on their own stream, see
//! [`ClockFrame`](crate::components::view::ClockFrame).

use crate::common::ViewId;
use crate::model::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Events related to the lifecycle of the engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    /// Fired once when the dispatcher loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine is about to exit.
    EngineShutdown,
    /// Fired when a view is attached and will receive frames.
    ViewAttached { id: ViewId },
    /// Fired when a view is detached.
    ViewDetached { id: ViewId },
    /// Fired whenever a ticker is acquired, including re-acquisition at a new cadence.
    TickerStarted { interval: Duration },
    /// Fired when the running ticker is released and none replaces it.
    TickerStopped,
}

/// Events describing changes to the application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A user action swapped in a new document.
    Replaced(Arc<AppState>),
    /// The stored document was discarded and the default reinstated.
    Reset(Arc<AppState>),
}

impl StateEvent {
    pub fn state(&self) -> &AppState {
        match self {
            StateEvent::Replaced(state) | StateEvent::Reset(state) => state,
        }
    }
}
