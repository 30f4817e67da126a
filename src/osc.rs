//! OSC module - inbound routing and outbound notifications
//!
//! Datagrams arrive at the [`Listener`], are decoded with `rosc` and handed to
//! the [`Router`], which finds the first matching [`MessageHandler`] and lets
//! it mutate the [`StateStore`](crate::state::StateStore). The [`Notifier`]
//! sends the occasional action trigger back to REAPER.

mod handler;
mod listener;
mod notifier;
mod pattern;
mod router;
mod value;

#[cfg(test)]
mod tests;

pub use handler::{
    default_handlers, HandlerError, MessageHandler, TrackHandler, TrackHandlerSpec,
    DEFAULT_TRACK_HANDLERS,
};
pub use listener::{Listener, ListenerHandle};
pub use notifier::{Notifier, REFRESH_TRACKS_ACTION};
pub use pattern::{AddressPattern, PatternError};
pub use router::{DispatchOutcome, Router, UnhandledPolicy};
pub use value::{cast, CastError};
