//! REAPER OSC bridge
//!
//! Mirrors REAPER's OSC track feedback into an in-memory model and serves it
//! over HTTP.

pub mod api;
pub mod config;
pub mod osc;
pub mod state;
