//! radio.rs — the hubs' end of the broadcast medium.
//!
//! All simulated hubs in this process share one socket. Incoming command
//! envelopes land in a last-value-per-channel inbox, which mirrors the
//! physical medium: a broadcast value stays "on the air" until its writer
//! replaces it, and each hub polls `observe` on its own cadence. The dedup
//! ledgers above make the repeats harmless.
//!
//! An artificial drop rate can be applied to both directions — the protocol
//! is supposed to survive a lossy medium, so the simulator provides one.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use rail_types::{Envelope, WireValue};

// ── Configuration ─────────────────────────────────────────────────────────────

pub struct RadioConfig {
    /// UDP port the hubs listen on for command envelopes.
    pub bind_port: u16,
    /// Where status envelopes are sent.
    pub leader_addr: String,
    /// Optional multicast mirror for status envelopes.
    pub multicast_addr: Option<String>,
    /// Probability (0.0..1.0) that any datagram is silently dropped.
    pub drop_rate: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            bind_port: std::env::var("RAIL_HUB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7701),
            leader_addr: std::env::var("RAIL_LEADER_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:7700".to_string()),
            multicast_addr: std::env::var("RAIL_MULTICAST_GROUP").ok(),
            drop_rate: 0.0,
        }
    }
}

// ── Radio ─────────────────────────────────────────────────────────────────────

pub struct HubRadio {
    socket: Arc<UdpSocket>,
    leader_addr: String,
    multicast_addr: Option<String>,
    inbox: Arc<RwLock<HashMap<u8, Vec<WireValue>>>>,
    drop_rate: f64,
}

impl HubRadio {
    pub async fn bind(config: RadioConfig) -> anyhow::Result<Arc<Self>> {
        let addr = format!("0.0.0.0:{}", config.bind_port);
        let socket = Arc::new(
            UdpSocket::bind(&addr)
                .await
                .with_context(|| format!("binding hub radio on {addr}"))?,
        );
        info!("📡 Hub radio listening on UDP {addr}");

        let inbox: Arc<RwLock<HashMap<u8, Vec<WireValue>>>> = Arc::new(RwLock::new(HashMap::new()));
        tokio::spawn(receive_loop(
            socket.clone(),
            inbox.clone(),
            config.drop_rate,
        ));

        Ok(Arc::new(Self {
            socket,
            leader_addr: config.leader_addr,
            multicast_addr: config.multicast_addr,
            inbox,
            drop_rate: config.drop_rate,
        }))
    }

    /// Latest value seen on a channel, like polling a broadcast receiver.
    pub async fn observe(&self, channel: u8) -> Option<Vec<WireValue>> {
        self.inbox.read().await.get(&channel).cloned()
    }

    /// Replace this writer's outbound value on a channel: one envelope out.
    pub async fn broadcast(&self, channel: u8, data: Vec<WireValue>) {
        if self.drop_rate > 0.0 && rand::thread_rng().gen::<f64>() < self.drop_rate {
            debug!("radio: outbound envelope on channel {channel} lost (fault injection)");
            return;
        }
        let envelope = Envelope::new(channel, data);
        let bytes = match envelope.to_bytes() {
            Ok(b) => b,
            Err(e) => {
                warn!("radio: status serialize failed: {e}");
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&bytes, &self.leader_addr).await {
            warn!("radio: send to {} failed: {e}", self.leader_addr);
        }
        if let Some(mc) = &self.multicast_addr {
            if let Err(e) = self.socket.send_to(&bytes, mc).await {
                warn!("radio: multicast send failed: {e}");
            }
        }
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    inbox: Arc<RwLock<HashMap<u8, Vec<WireValue>>>>,
    drop_rate: f64,
) {
    let mut buf = vec![0u8; 2048];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                if drop_rate > 0.0 && rand::thread_rng().gen::<f64>() < drop_rate {
                    debug!("radio: inbound datagram from {src} lost (fault injection)");
                    continue;
                }
                let Some(envelope) = Envelope::from_bytes(&buf[..len]) else {
                    debug!("radio: malformed datagram from {src}, dropped");
                    continue;
                };
                inbox.write().await.insert(envelope.channel, envelope.data);
            }
            Err(e) => {
                // Never crash a hub over the network.
                warn!("radio: UDP recv error: {e}");
            }
        }
    }
}
