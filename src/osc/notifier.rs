//! Outbound OSC notifications to REAPER
//!
//! Fire-and-forget: one datagram per call, no acknowledgement, no retry.

use anyhow::{anyhow, Context, Result};
use rosc::{OscMessage, OscPacket};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// REAPER action "Track: Refresh all tracks" (re-sends the full track state)
pub const REFRESH_TRACKS_ACTION: u32 = 41743;

/// Sends OSC messages to a fixed peer
pub struct Notifier {
    socket: UdpSocket,
    host: String,
    port: u16,
}

impl Notifier {
    /// Bind an ephemeral IPv4 socket for sending to `host:port`
    pub async fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("Failed to bind OSC send socket")?;
        Ok(Self {
            socket,
            host: host.into(),
            port,
        })
    }

    /// Configured peer as `host:port`
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Trigger REAPER action `action_id` via `/action/<id>`
    pub async fn notify(&self, action_id: u32) -> Result<()> {
        self.send_message(&format!("/action/{}", action_id), Vec::new())
            .await
    }

    /// Ask REAPER to re-send every track's state
    pub async fn refresh_tracks(&self) -> Result<()> {
        info!("Refreshing track list on {}", self.peer());
        self.notify(REFRESH_TRACKS_ACTION).await
    }

    /// Encode and send a single OSC message
    pub async fn send_message(&self, addr: &str, args: Vec<rosc::OscType>) -> Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let buf = rosc::encoder::encode(&packet)
            .map_err(|e| anyhow!("Failed to encode OSC message {}: {}", addr, e))?;

        let target = self.resolve().await?;
        self.socket
            .send_to(&buf, target)
            .await
            .with_context(|| format!("Failed to send {} to {}", addr, target))?;

        debug!("📤 Sent {} to {}", addr, target);
        Ok(())
    }

    /// Resolve the peer on every send so a DNS change is picked up
    async fn resolve(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Failed to resolve {}", self.peer()))?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| anyhow!("No IPv4 address for {}", self.peer()))
    }
}
