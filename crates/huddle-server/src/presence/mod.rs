//! Per-server user presence

mod tracker;

pub use tracker::{PresenceStatus, PresenceTracker, ServerUser, StaleUser};
