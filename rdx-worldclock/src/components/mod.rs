//! Contains the building blocks the engine manages.
//!
//! Views are the only component so far: each attached view turns the current
//! application state into a frame on every tick.

pub mod view;
