//! coordinator.rs — the leader's live view of the layout.
//!
//! Owns everything the original scattered across process globals: the switch
//! and train maps, the per-channel dedup ledgers, and the single monotonic
//! command counter. Status ingestion is pull-based — callers invoke
//! `check_status_updates` on their own cadence and the coordinator drains
//! whatever the radio has queued since.

use std::collections::HashMap;

use tracing::{debug, info};

use rail_types::ids::pattern_string;
use rail_types::{
    Color, Command, DedupLedger, Direction, Freshness, Movement, Status, SwitchId, SwitchPosition,
    TrainId,
};

use crate::radio::LeaderRadio;

/// Last known facts about one train, as reported by its hub.
#[derive(Debug, Clone)]
pub struct TrainSnapshot {
    pub seeing: Color,
    pub movement: Movement,
    pub target_pattern: Vec<Color>,
}

pub struct Coordinator {
    radio: LeaderRadio,
    pub switch_states: HashMap<SwitchId, SwitchPosition>,
    pub train_states: HashMap<TrainId, TrainSnapshot>,
    ledgers: HashMap<u8, DedupLedger>,
    command_seq: i64,
    processed_statuses: u64,
}

impl Coordinator {
    pub fn new(radio: LeaderRadio) -> Self {
        Self {
            radio,
            switch_states: HashMap::new(),
            train_states: HashMap::new(),
            ledgers: HashMap::new(),
            command_seq: 0,
            processed_statuses: 0,
        }
    }

    fn next_seq(&mut self) -> i64 {
        self.command_seq += 1;
        self.command_seq
    }

    /// Count of status frames accepted so far. The executor compares this
    /// across a wait window to tell "confirmed" from "stale map".
    pub fn processed_statuses(&self) -> u64 {
        self.processed_statuses
    }

    // ── Command senders ───────────────────────────────────────────────────────

    pub async fn send_switch_command(&mut self, switch: SwitchId, position: SwitchPosition) -> i64 {
        let seq = self.next_seq();
        info!("Sending command #{seq}: {switch} -> {position}");
        self.radio
            .broadcast(&Command::Switch {
                seq,
                switch,
                position,
            })
            .await;
        seq
    }

    pub async fn send_stop_command(&mut self, train: TrainId) -> i64 {
        let seq = self.next_seq();
        info!("Sending command #{seq}: {train} -> STOP");
        self.radio.broadcast(&Command::Stop { seq, train }).await;
        seq
    }

    pub async fn send_pursue_command(
        &mut self,
        train: TrainId,
        direction: Direction,
        pattern: Vec<Color>,
    ) -> i64 {
        let seq = self.next_seq();
        info!(
            "Sending command #{seq}: {train} -> {}_UNTIL_PATTERN, pattern={}",
            direction,
            pattern_string(&pattern)
        );
        self.radio
            .broadcast(&Command::Pursue {
                seq,
                train,
                direction,
                pattern,
            })
            .await;
        seq
    }

    // ── Status ingestion ──────────────────────────────────────────────────────

    /// Drain the radio queue: dedupe on (channel, seq), decode, apply.
    /// Malformed frames and duplicates vanish here; callers only ever see
    /// the updated maps.
    pub fn check_status_updates(&mut self) {
        while let Some(envelope) = self.radio.try_recv() {
            let Some(status) = Status::decode(&envelope.data) else {
                debug!("dropping malformed status on channel {}", envelope.channel);
                continue;
            };
            let ledger = self.ledgers.entry(envelope.channel).or_default();
            if ledger.observe(status.seq()) == Freshness::Duplicate {
                continue;
            }
            self.processed_statuses += 1;

            match status {
                Status::Switches { seq, positions } => {
                    debug!(
                        "status #{seq} on channel {}: {} switches",
                        envelope.channel,
                        positions.len()
                    );
                    for (switch, position) in positions {
                        self.switch_states.insert(switch, position);
                    }
                }
                Status::Train {
                    seq,
                    train,
                    seeing,
                    movement,
                    pattern,
                } => {
                    debug!("status #{seq}: {train} {movement}, seeing {seeing}");
                    self.train_states.insert(
                        train,
                        TrainSnapshot {
                            seeing,
                            movement,
                            target_pattern: pattern,
                        },
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::{LeaderRadio, RadioConfig};
    use rail_types::channel::switch_status_channel;
    use rail_types::Envelope;
    use std::time::Duration;

    async fn test_coordinator() -> (Coordinator, tokio::net::UdpSocket, std::net::SocketAddr) {
        let radio = LeaderRadio::bind(RadioConfig {
            bind_port: 0,
            hub_addr: "127.0.0.1:9".into(),
            multicast_addr: None,
        })
        .await
        .unwrap();
        let port = radio.local_addr().unwrap().port();
        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
        let sender = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (Coordinator::new(radio), sender, addr)
    }

    async fn deliver(
        co: &mut Coordinator,
        sender: &tokio::net::UdpSocket,
        addr: std::net::SocketAddr,
        envelope: &Envelope,
    ) {
        sender
            .send_to(&envelope.to_bytes().unwrap(), addr)
            .await
            .unwrap();
        // Localhost delivery is fast but still asynchronous.
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            co.check_status_updates();
            if co.processed_statuses() > 0 {
                break;
            }
        }
    }

    #[tokio::test]
    async fn snapshot_updates_the_switch_map() {
        let (mut co, sender, addr) = test_coordinator().await;
        let status = Status::Switches {
            seq: 1,
            positions: vec![
                (SwitchId::A, SwitchPosition::Diverging),
                (SwitchId::B, SwitchPosition::Straight),
            ],
        };
        let envelope = Envelope::new(switch_status_channel(1), status.encode());

        deliver(&mut co, &sender, addr, &envelope).await;
        assert_eq!(
            co.switch_states.get(&SwitchId::A),
            Some(&SwitchPosition::Diverging)
        );
        let processed = co.processed_statuses();
        assert_eq!(processed, 1);

        // A replayed frame changes nothing: same (channel, seq).
        sender
            .send_to(&envelope.to_bytes().unwrap(), addr)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        co.check_status_updates();
        assert_eq!(co.processed_statuses(), processed);
    }

    #[tokio::test]
    async fn command_seqs_strictly_increase() {
        let (mut co, _sender, _addr) = test_coordinator().await;
        let a = co
            .send_switch_command(SwitchId::C, SwitchPosition::Diverging)
            .await;
        let b = co.send_stop_command(TrainId::Csx).await;
        let c = co
            .send_pursue_command(TrainId::Csx, Direction::Forward, vec![Color::Red])
            .await;
        assert!(a < b && b < c);
    }
}
