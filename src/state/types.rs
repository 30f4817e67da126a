//! Track state type definitions
//!
//! Defines the mixer track model and the finite set of attributes that
//! inbound OSC messages are allowed to mutate.

use serde::{Deserialize, Serialize};

/// Default volume for a freshly created track (unity gain)
pub const DEFAULT_VOLUME: f64 = 1.0;

/// One mixer channel as reported by REAPER
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track number (immutable once created)
    pub id: u32,
    /// Track name as shown in the DAW
    pub name: String,
    /// Fader position
    pub volume: f64,
    pub muted: bool,
    pub solo: bool,
    pub rec_armed: bool,
}

impl Track {
    /// Create a track with default attributes
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: String::new(),
            volume: DEFAULT_VOLUME,
            muted: false,
            solo: false,
            rec_armed: false,
        }
    }

    /// Assign a single attribute.
    ///
    /// Returns `false` (and leaves the track untouched) when the value kind
    /// does not match the attribute's declared kind.
    pub fn apply(&mut self, attribute: TrackAttribute, value: TrackValue) -> bool {
        match (attribute, value) {
            (TrackAttribute::Volume, TrackValue::Float(v)) => self.volume = v,
            (TrackAttribute::Muted, TrackValue::Bool(b)) => self.muted = b,
            (TrackAttribute::Solo, TrackValue::Bool(b)) => self.solo = b,
            (TrackAttribute::RecArmed, TrackValue::Bool(b)) => self.rec_armed = b,
            (TrackAttribute::Name, TrackValue::Text(s)) => self.name = s,
            _ => return false,
        }
        true
    }

    /// Current value of a single attribute
    pub fn value(&self, attribute: TrackAttribute) -> TrackValue {
        match attribute {
            TrackAttribute::Volume => TrackValue::Float(self.volume),
            TrackAttribute::Muted => TrackValue::Bool(self.muted),
            TrackAttribute::Name => TrackValue::Text(self.name.clone()),
            TrackAttribute::Solo => TrackValue::Bool(self.solo),
            TrackAttribute::RecArmed => TrackValue::Bool(self.rec_armed),
        }
    }
}

/// Track attributes that can be set from OSC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackAttribute {
    Volume,
    Muted,
    Name,
    Solo,
    RecArmed,
}

impl TrackAttribute {
    /// All attributes, in default handler registration order
    pub fn all() -> &'static [TrackAttribute] {
        &[
            TrackAttribute::Volume,
            TrackAttribute::Muted,
            TrackAttribute::Name,
            TrackAttribute::Solo,
            TrackAttribute::RecArmed,
        ]
    }

    /// Field name on [`Track`]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackAttribute::Volume => "volume",
            TrackAttribute::Muted => "muted",
            TrackAttribute::Name => "name",
            TrackAttribute::Solo => "solo",
            TrackAttribute::RecArmed => "rec_armed",
        }
    }

    /// Declared value kind for this attribute
    pub fn kind(&self) -> ValueKind {
        match self {
            TrackAttribute::Volume => ValueKind::Float,
            TrackAttribute::Name => ValueKind::Text,
            TrackAttribute::Muted | TrackAttribute::Solo | TrackAttribute::RecArmed => {
                ValueKind::Bool
            }
        }
    }
}

impl std::fmt::Display for TrackAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of value an attribute accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Float,
    Bool,
    Text,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Float => write!(f, "float"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Text => write!(f, "text"),
        }
    }
}

/// A value already cast to an attribute's kind
#[derive(Debug, Clone, PartialEq)]
pub enum TrackValue {
    Float(f64),
    Bool(bool),
    Text(String),
}

impl TrackValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TrackValue::Float(_) => ValueKind::Float,
            TrackValue::Bool(_) => ValueKind::Bool,
            TrackValue::Text(_) => ValueKind::Text,
        }
    }
}

impl std::fmt::Display for TrackValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackValue::Float(v) => write!(f, "{}", v),
            TrackValue::Bool(b) => write!(f, "{}", b),
            TrackValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}
