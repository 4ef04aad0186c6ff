//! radio.rs — the leader's end of the broadcast medium.
//!
//! Commands go out as channel-1 envelopes over UDP; status envelopes from
//! the hubs arrive on a background receive task and queue up until the
//! coordinator drains them. The medium is lossy by nature and the protocol
//! above tolerates that, so send and receive errors are logged, never fatal.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rail_types::channel::{is_switch_status, is_train_status};
use rail_types::{Command, Envelope, COMMAND_CHANNEL};

// ── Configuration ─────────────────────────────────────────────────────────────

pub struct RadioConfig {
    /// UDP port the leader listens on for status envelopes.
    pub bind_port: u16,
    /// Where command envelopes are sent (the hub simulator or a bridge).
    pub hub_addr: String,
    /// Optional multicast mirror for command envelopes.
    pub multicast_addr: Option<String>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            bind_port: std::env::var("RAIL_LEADER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7700),
            hub_addr: std::env::var("RAIL_HUB_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:7701".to_string()),
            multicast_addr: std::env::var("RAIL_MULTICAST_GROUP").ok(),
        }
    }
}

// ── Radio ─────────────────────────────────────────────────────────────────────

pub struct LeaderRadio {
    socket: Arc<UdpSocket>,
    hub_addr: String,
    multicast_addr: Option<String>,
    inbound: mpsc::Receiver<Envelope>,
}

impl LeaderRadio {
    pub async fn bind(config: RadioConfig) -> anyhow::Result<Self> {
        let addr = format!("0.0.0.0:{}", config.bind_port);
        let socket = Arc::new(
            UdpSocket::bind(&addr)
                .await
                .with_context(|| format!("binding leader radio on {addr}"))?,
        );
        info!("📡 Leader radio listening on UDP {addr}");

        let (tx, rx) = mpsc::channel(256);
        let recv_socket = socket.clone();
        tokio::spawn(receive_loop(recv_socket, tx));

        Ok(Self {
            socket,
            hub_addr: config.hub_addr,
            multicast_addr: config.multicast_addr,
            inbound: rx,
        })
    }

    /// The locally bound address (useful when bound to port 0).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Broadcast one command on channel 1.
    pub async fn broadcast(&self, command: &Command) {
        let envelope = Envelope::new(COMMAND_CHANNEL, command.encode());
        let bytes = match envelope.to_bytes() {
            Ok(b) => b,
            Err(e) => {
                warn!("radio: command serialize failed: {e}");
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&bytes, &self.hub_addr).await {
            warn!("radio: send to {} failed: {e}", self.hub_addr);
        }
        if let Some(mc) = &self.multicast_addr {
            if let Err(e) = self.socket.send_to(&bytes, mc).await {
                warn!("radio: multicast send failed: {e}");
            }
        }
    }

    /// Next queued status envelope, if any. Non-blocking; the coordinator
    /// polls this on its status-check cadence.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.inbound.try_recv().ok()
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, tx: mpsc::Sender<Envelope>) {
    let mut buf = vec![0u8; 2048];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let Some(envelope) = Envelope::from_bytes(&buf[..len]) else {
                    debug!("radio: malformed datagram from {src}, dropped");
                    continue;
                };
                if !is_switch_status(envelope.channel) && !is_train_status(envelope.channel) {
                    continue;
                }
                // Queue full means the coordinator is far behind; dropping is
                // no worse than the medium itself dropping.
                let _ = tx.try_send(envelope);
            }
            Err(e) => {
                warn!("radio: UDP recv error: {e}");
            }
        }
    }
}
