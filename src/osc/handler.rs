//! OSC message handlers
//!
//! A handler decides whether it owns an address and, if so, applies the
//! message to the [`StateStore`]. Track handlers are all the same type,
//! configured by a [`TrackHandlerSpec`] (suffix + attribute); the attribute
//! determines the cast.

use super::pattern::{AddressPattern, PatternError};
use super::value::{cast, CastError};
use crate::state::{StateError, StateStore, Track, TrackAttribute};
use rosc::OscType;
use thiserror::Error;
use tracing::{error, info};

/// Handler trait - everything the router can dispatch to implements this
///
/// `handle` reports a plain success flag; failures are logged by the
/// handler itself and never propagate past the router.
pub trait MessageHandler: Send + Sync {
    /// Stable label used in logs (e.g. "track.volume")
    fn name(&self) -> &str;

    /// Does this handler own `address`?
    fn matches(&self, address: &str) -> bool;

    /// Apply the message. Only called when `matches` returned true.
    fn handle(&self, state: &StateStore, address: &str, args: &[OscType]) -> bool;
}

/// Why a track handler rejected a message
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Configuration record for one track handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHandlerSpec {
    /// Terminal address segment (e.g. "vu" for `/track/<id>/vu`)
    pub suffix: &'static str,
    /// Attribute the first argument is written to
    pub attribute: TrackAttribute,
}

/// Handlers registered by default, in dispatch order
pub const DEFAULT_TRACK_HANDLERS: [TrackHandlerSpec; 5] = [
    TrackHandlerSpec {
        suffix: "vu",
        attribute: TrackAttribute::Volume,
    },
    TrackHandlerSpec {
        suffix: "mute",
        attribute: TrackAttribute::Muted,
    },
    TrackHandlerSpec {
        suffix: "name",
        attribute: TrackAttribute::Name,
    },
    TrackHandlerSpec {
        suffix: "solo",
        attribute: TrackAttribute::Solo,
    },
    TrackHandlerSpec {
        suffix: "recarm",
        attribute: TrackAttribute::RecArmed,
    },
];

/// Sets one track attribute from `/track/<id>/<suffix> <value>`
#[derive(Debug, Clone)]
pub struct TrackHandler {
    name: String,
    pattern: AddressPattern,
    attribute: TrackAttribute,
}

impl TrackHandler {
    pub fn new(spec: TrackHandlerSpec) -> Result<Self, regex::Error> {
        Ok(Self {
            name: format!("track.{}", spec.attribute),
            pattern: AddressPattern::track(spec.suffix)?,
            attribute: spec.attribute,
        })
    }

    /// Apply the message and return the updated track.
    ///
    /// `Ok(None)` means the address was valid but carried no argument, so
    /// nothing was written (and no track was created).
    pub fn apply(
        &self,
        state: &StateStore,
        address: &str,
        args: &[OscType],
    ) -> Result<Option<Track>, HandlerError> {
        let track_id = self.pattern.extract_track_id(address)?;

        let Some(arg) = args.first() else {
            return Ok(None);
        };

        let value = cast(self.attribute.kind(), arg)?;
        let track = state.set_attribute(track_id, self.attribute, value)?;
        Ok(Some(track))
    }
}

impl MessageHandler for TrackHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, address: &str) -> bool {
        self.pattern.matches(address)
    }

    fn handle(&self, state: &StateStore, address: &str, args: &[OscType]) -> bool {
        match self.apply(state, address, args) {
            Ok(Some(track)) => {
                info!(
                    track = track.id,
                    attribute = %self.attribute,
                    "Track {} {} set to {}",
                    track.id,
                    self.attribute,
                    track.value(self.attribute)
                );
                true
            }
            Ok(None) => true,
            Err(e) => {
                error!("Error handling {} for {}: {}", self.attribute, address, e);
                false
            }
        }
    }
}

/// Build the default handler list
pub fn default_handlers() -> Result<Vec<Box<dyn MessageHandler>>, regex::Error> {
    DEFAULT_TRACK_HANDLERS
        .iter()
        .map(|spec| -> Result<Box<dyn MessageHandler>, regex::Error> {
            Ok(Box::new(TrackHandler::new(*spec)?))
        })
        .collect()
}
