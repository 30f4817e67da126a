//! State management module - track state mirrored from REAPER
//!
//! The store is the single owner of every [`Track`]. The OSC router is the
//! only writer; the HTTP API reads snapshots.

mod store;
mod types;

pub use store::{StateError, StateStore};
pub use types::{Track, TrackAttribute, TrackValue, ValueKind, DEFAULT_VOLUME};
