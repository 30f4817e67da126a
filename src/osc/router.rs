//! OSC router - first-match-wins dispatch over an ordered handler list

use super::handler::{default_handlers, MessageHandler};
use crate::state::StateStore;
use rosc::{OscMessage, OscPacket, OscType};
use tracing::{debug, error, info, trace, warn, Level};

/// What to do with messages no handler claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnhandledPolicy {
    /// Emit a log record for unhandled messages
    pub enabled: bool,
    /// Severity of that record
    pub level: Level,
}

impl Default for UnhandledPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::WARN,
        }
    }
}

impl UnhandledPolicy {
    pub fn silent() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn report(&self, address: &str, args: &[OscType]) {
        if !self.enabled {
            return;
        }
        match self.level {
            Level::ERROR => error!("Unhandled OSC message at {}: {:?}", address, args),
            Level::WARN => warn!("Unhandled OSC message at {}: {:?}", address, args),
            Level::INFO => info!("Unhandled OSC message at {}: {:?}", address, args),
            Level::DEBUG => debug!("Unhandled OSC message at {}: {:?}", address, args),
            _ => trace!("Unhandled OSC message at {}: {:?}", address, args),
        }
    }
}

/// Result of dispatching one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler matched and succeeded
    Handled,
    /// A handler matched and reported failure
    Rejected,
    /// No handler matched
    Unhandled,
}

/// Routes inbound OSC messages to handlers
///
/// Configured once at startup; the handler list is never modified afterwards,
/// so a router can be shared across tasks behind an `Arc`.
pub struct Router {
    state: StateStore,
    handlers: Vec<Box<dyn MessageHandler>>,
    unhandled: UnhandledPolicy,
}

impl Router {
    /// Create a router over `handlers`, dispatched in the given order
    pub fn new(
        state: StateStore,
        handlers: Vec<Box<dyn MessageHandler>>,
        unhandled: UnhandledPolicy,
    ) -> Self {
        for handler in &handlers {
            debug!("Registered handler: {}", handler.name());
        }
        Self {
            state,
            handlers,
            unhandled,
        }
    }

    /// Create a router with the five default track handlers
    pub fn with_default_handlers(
        state: StateStore,
        unhandled: UnhandledPolicy,
    ) -> Result<Self, regex::Error> {
        Ok(Self::new(state, default_handlers()?, unhandled))
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Dispatch one message to the first matching handler.
    ///
    /// A failing handler is not retried against later handlers.
    pub fn dispatch(&self, address: &str, args: &[OscType]) -> DispatchOutcome {
        match self.handlers.iter().find(|h| h.matches(address)) {
            Some(handler) => {
                if handler.handle(&self.state, address, args) {
                    DispatchOutcome::Handled
                } else {
                    DispatchOutcome::Rejected
                }
            }
            None => {
                self.unhandled.report(address, args);
                DispatchOutcome::Unhandled
            }
        }
    }

    pub fn dispatch_message(&self, msg: &OscMessage) -> DispatchOutcome {
        self.dispatch(&msg.addr, &msg.args)
    }

    /// Dispatch every message in a packet, flattening bundles in order
    pub fn dispatch_packet(&self, packet: &OscPacket) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        self.collect_packet(packet, &mut outcomes);
        outcomes
    }

    fn collect_packet(&self, packet: &OscPacket, outcomes: &mut Vec<DispatchOutcome>) {
        match packet {
            OscPacket::Message(msg) => outcomes.push(self.dispatch_message(msg)),
            OscPacket::Bundle(bundle) => {
                for p in &bundle.content {
                    self.collect_packet(p, outcomes);
                }
            }
        }
    }
}
