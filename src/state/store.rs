//! StateStore - In-memory track state shared between the OSC router and readers
//!
//! Tracks are created lazily on first reference and only ever updated one
//! attribute at a time. All writes go through a single write-lock
//! acquisition so get-or-create and assignment are atomic together.

use super::types::{Track, TrackAttribute, TrackValue, ValueKind};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

type TrackMap = BTreeMap<u32, Track>;

/// Errors raised by state lookups and mutations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    /// No track carries the requested name
    #[error("Track with name '{name}' not found")]
    TrackNotFound { name: String },

    /// The value kind does not fit the attribute
    #[error("Attribute '{attribute}' expects a {expected} value")]
    KindMismatch {
        attribute: TrackAttribute,
        expected: ValueKind,
    },
}

/// Shared track state, cheap to clone
#[derive(Clone, Default)]
pub struct StateStore {
    tracks: Arc<RwLock<TrackMap>>,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the track with `id`, creating it with defaults if absent.
    ///
    /// Returns a snapshot; repeated calls never reset an existing track.
    pub fn get_or_create(&self, id: u32) -> Track {
        let mut tracks = self.tracks.write();
        tracks.entry(id).or_insert_with(|| Track::new(id)).clone()
    }

    /// Get the track with `id` without creating it
    pub fn get(&self, id: u32) -> Option<Track> {
        self.tracks.read().get(&id).cloned()
    }

    /// Find the first track (lowest id) whose name equals `name`
    pub fn find_by_name(&self, name: &str) -> Result<Track, StateError> {
        self.tracks
            .read()
            .values()
            .find(|track| track.name == name)
            .cloned()
            .ok_or_else(|| StateError::TrackNotFound {
                name: name.to_string(),
            })
    }

    /// Set one attribute on track `id`, creating the track if needed.
    ///
    /// The kind check happens before the lock is taken, so a mismatched value
    /// neither creates the track nor touches an existing one.
    pub fn set_attribute(
        &self,
        id: u32,
        attribute: TrackAttribute,
        value: TrackValue,
    ) -> Result<Track, StateError> {
        if value.kind() != attribute.kind() {
            return Err(StateError::KindMismatch {
                attribute,
                expected: attribute.kind(),
            });
        }

        let mut tracks = self.tracks.write();
        let track = tracks.entry(id).or_insert_with(|| Track::new(id));
        let applied = track.apply(attribute, value);
        debug_assert!(applied, "kind of {} checked before locking", attribute);
        Ok(track.clone())
    }

    /// Snapshot of all tracks ordered by id
    pub fn list(&self) -> Vec<Track> {
        self.tracks.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.read().is_empty()
    }
}
