//! UDP listener feeding inbound OSC packets to the router
//!
//! The receive loop runs on its own tokio task and spawns one task per
//! datagram, so slow handling never stalls the socket.

use super::router::Router;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Largest datagram we accept (UDP payload limit)
const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Bound OSC socket, not yet receiving
pub struct Listener {
    socket: UdpSocket,
    router: Arc<Router>,
}

impl Listener {
    /// Bind the listen socket. Failure here is fatal for the bridge.
    pub async fn bind(addr: &str, router: Arc<Router>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind OSC listener on {}", addr))?;
        Ok(Self { socket, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Start the receive loop in the background
    pub fn spawn(self) -> Result<ListenerHandle> {
        let local_addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(receive_loop(self.socket, self.router, shutdown_rx));
        info!("Serving OSC on {}", local_addr);

        Ok(ListenerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

/// Handle to a running listener
///
/// Dropping the handle detaches the listener: it keeps receiving until the
/// process exits. Call [`ListenerHandle::shutdown`] to stop it.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop receiving and wait for the loop to exit.
    ///
    /// Messages already handed to dispatch tasks may still complete.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.task.await.context("OSC listener task panicked")?;
        info!("OSC listener on {} stopped", self.local_addr);
        Ok(())
    }
}

async fn receive_loop(
    socket: UdpSocket,
    router: Arc<Router>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    // Only an explicit shutdown stops the loop; a dropped handle detaches it
    let shutdown = async move {
        if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, from)) => {
                        trace!("📥 {} bytes from {}", len, from);
                        match rosc::decoder::decode_udp(&buf[..len]) {
                            Ok((_, packet)) => {
                                let router = router.clone();
                                tokio::spawn(async move {
                                    router.dispatch_packet(&packet);
                                });
                            }
                            Err(e) => {
                                warn!("Dropping undecodable OSC datagram from {}: {}", from, e);
                            }
                        }
                    }
                    Err(e) => {
                        // Windows reports ICMP port-unreachable as a recv error
                        warn!("OSC receive error: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                debug!("OSC listener shutdown requested");
                break;
            }
        }
    }
}
