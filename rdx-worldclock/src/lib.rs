//! # World Clock
//!
//! The core of a world clock: a time engine that renders any instant in any
//! IANA zone, and a persisted application state describing which cities are
//! tracked and how their clocks look.
//!
//! ## Core Concepts
//!
//! - **Time Engine**: Pure functions that turn a UTC instant and a zone into
//!   digital text or analog hand angles. See [`clock`].
//! - **State Store**: A versioned JSON document (cities plus clock settings)
//!   kept in a pluggable key-value storage. Every user action replaces the
//!   whole document and persists it.
//! - **Views and Ticker**: Front-ends attach views to the engine. While any
//!   view is attached a single ticker re-renders them, once per second when
//!   seconds are shown and once per minute otherwise.
//! - **Event-Driven**: Front-ends subscribe to strongly-typed streams
//!   (`SystemEvent`, `StateEvent`, rendered `ClockFrame`s) instead of polling.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use worldclock::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load configuration from the environment, with defaults.
//!     let config = WorldClockConfig::load(None)?;
//!
//!     // 2. Create the engine. The stored state is loaded here.
//!     let engine = WorldClockEngine::from_config(config)?;
//!
//!     // 3. Subscribe to rendered frames before starting the engine.
//!     let mut frames = engine.subscribe_frames();
//!     tokio::spawn(async move {
//!         while let Ok(frame) = frames.recv().await {
//!             println!("{:?}", frame.content);
//!         }
//!     });
//!
//!     // 4. Attach a view; this starts the ticker.
//!     engine.attach_view(ViewKind::Overview).await;
//!
//!     // 5. Run the engine. It will shut down on Ctrl+C.
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "World Clock";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod catalog;
pub mod clock;
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod events;
pub mod images;
pub mod model;
pub mod storage;
pub mod store;
pub mod time;

/// A prelude module for easy importing of the most common world clock types.
pub mod prelude {
    pub use crate::catalog::CityOption;
    pub use crate::clock::{analog_angles, format_time, time_parts, HandAngles, TimeParts};
    pub use crate::common::{CityId, ViewId};
    pub use crate::components::view::{
        ClockDisplay, ClockFrame, ClockReading, FrameContent, ViewKind,
    };
    pub use crate::config::WorldClockConfig;
    pub use crate::engine::WorldClockEngine;
    pub use crate::events::{StateEvent, SystemEvent};
    pub use crate::images::Continent;
    pub use crate::model::{AppState, City, ClockSettings, ClockStyle};
    pub use crate::store::{NewCity, StateStore};
}
