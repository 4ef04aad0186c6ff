//! switch_hub.rs — follower hub driving one to three track switches.
//!
//! The actuator protocol per command: drive the motor at full power in the
//! direction given by the switch's polarity and target position, hold for
//! the motor-kind's move time, brake, record, broadcast a full snapshot.
//! Commands are processed to completion one at a time; there is no
//! concurrency inside a hub.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use rail_types::channel::switch_status_channel;
use rail_types::{
    Command, DedupLedger, Freshness, Status, SwitchId, SwitchPosition, WireValue, COMMAND_CHANNEL,
};

use crate::radio::HubRadio;

pub const MOTOR_POWER: i8 = 100;
pub const POLL_INTERVAL_MS: u64 = 50;

// ── Switch hardware description ───────────────────────────────────────────────

/// Medium motors throw faster than large ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorKind {
    M,
    L,
}

impl MotorKind {
    pub fn move_time(self) -> Duration {
        match self {
            Self::M => Duration::from_millis(80),
            Self::L => Duration::from_millis(100),
        }
    }
}

/// Static per-switch configuration: which way the mechanism is mounted
/// (polarity ±1 applied to motor power) and which motor drives it.
#[derive(Debug, Clone, Copy)]
pub struct SwitchSpec {
    pub id: SwitchId,
    pub polarity: i8,
    pub kind: MotorKind,
}

pub trait SwitchMotor: Send {
    fn dc(&mut self, power: i8);
    fn brake(&mut self);
}

// ── Hub ───────────────────────────────────────────────────────────────────────

pub struct SwitchHub {
    hub_index: u8,
    switches: Vec<(SwitchSpec, Box<dyn SwitchMotor>)>,
    positions: BTreeMap<SwitchId, SwitchPosition>,
    ledger: DedupLedger,
    status_seq: i64,
    radio: Arc<HubRadio>,
}

impl SwitchHub {
    pub fn new(
        hub_index: u8,
        switches: Vec<(SwitchSpec, Box<dyn SwitchMotor>)>,
        radio: Arc<HubRadio>,
    ) -> Self {
        let positions = switches
            .iter()
            .map(|(spec, _)| (spec.id, SwitchPosition::Straight))
            .collect();
        Self {
            hub_index,
            switches,
            positions,
            ledger: DedupLedger::new(),
            status_seq: 0,
            radio,
        }
    }

    /// Boot (force everything to a known STRAIGHT), then poll commands until
    /// the stop button is pressed.
    pub async fn run(mut self, stop: Arc<AtomicBool>) {
        for i in 0..self.switches.len() {
            let id = self.switches[i].0.id;
            info!("hub {}: initializing {id} to STRAIGHT", self.hub_index);
            self.move_switch(i, SwitchPosition::Straight).await;
        }
        info!("hub {}: switches ready", self.hub_index);

        loop {
            if stop.load(Ordering::Relaxed) {
                info!("hub {}: stop pressed", self.hub_index);
                break;
            }
            if let Some(data) = self.radio.observe(COMMAND_CHANNEL).await {
                self.handle_command(&data).await;
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    /// Malformed frames, other devices' commands, and duplicates all drop
    /// silently — only a fresh command for an owned switch moves anything.
    pub async fn handle_command(&mut self, data: &[WireValue]) {
        let Some(Command::Switch {
            seq,
            switch,
            position,
        }) = Command::decode(data)
        else {
            return;
        };
        let Some(idx) = self.switches.iter().position(|(spec, _)| spec.id == switch) else {
            return;
        };
        if self.ledger.observe(seq) == Freshness::Duplicate {
            return;
        }
        info!(
            "hub {}: command #{seq}: {switch} -> {position}",
            self.hub_index
        );
        self.move_switch(idx, position).await;
    }

    async fn move_switch(&mut self, idx: usize, position: SwitchPosition) {
        let spec = self.switches[idx].0;
        let power = spec.polarity * MOTOR_POWER;
        {
            let motor = &mut self.switches[idx].1;
            motor.dc(if position == SwitchPosition::Diverging {
                power
            } else {
                -power
            });
            sleep(spec.kind.move_time()).await;
            motor.brake();
        }
        self.positions.insert(spec.id, position);
        self.broadcast_snapshot().await;
    }

    async fn broadcast_snapshot(&mut self) {
        self.status_seq += 1;
        let status = Status::Switches {
            seq: self.status_seq,
            positions: self.positions.iter().map(|(k, v)| (*k, *v)).collect(),
        };
        self.radio
            .broadcast(switch_status_channel(self.hub_index), status.encode())
            .await;
    }

    #[cfg(test)]
    pub fn position(&self, id: SwitchId) -> Option<SwitchPosition> {
        self.positions.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::RadioConfig;
    use crate::virtual_track::VirtualSwitchMotor;
    use std::sync::atomic::AtomicU32;

    async fn test_hub() -> (SwitchHub, Arc<AtomicU32>, Arc<AtomicU32>) {
        let radio = HubRadio::bind(RadioConfig {
            bind_port: 0,
            leader_addr: "127.0.0.1:9".into(),
            multicast_addr: None,
            drop_rate: 0.0,
        })
        .await
        .unwrap();

        let drives_b = Arc::new(AtomicU32::new(0));
        let drives_c = Arc::new(AtomicU32::new(0));
        let hub = SwitchHub::new(
            1,
            vec![
                (
                    SwitchSpec {
                        id: SwitchId::B,
                        polarity: -1,
                        kind: MotorKind::L,
                    },
                    Box::new(VirtualSwitchMotor::new(drives_b.clone())) as Box<dyn SwitchMotor>,
                ),
                (
                    SwitchSpec {
                        id: SwitchId::C,
                        polarity: 1,
                        kind: MotorKind::M,
                    },
                    Box::new(VirtualSwitchMotor::new(drives_c.clone())) as Box<dyn SwitchMotor>,
                ),
            ],
            radio,
        );
        (hub, drives_b, drives_c)
    }

    #[tokio::test]
    async fn duplicate_command_drives_once() {
        let (mut hub, drives_b, _) = test_hub().await;
        let frame = Command::Switch {
            seq: 7,
            switch: SwitchId::B,
            position: SwitchPosition::Diverging,
        }
        .encode();

        hub.handle_command(&frame).await;
        hub.handle_command(&frame).await;

        assert_eq!(drives_b.load(Ordering::Relaxed), 1);
        assert_eq!(hub.position(SwitchId::B), Some(SwitchPosition::Diverging));
        // Exactly one snapshot went out for the one physical movement.
        assert_eq!(hub.status_seq, 1);
    }

    #[tokio::test]
    async fn unowned_and_malformed_commands_are_ignored() {
        let (mut hub, drives_b, drives_c) = test_hub().await;

        // Switch A belongs to some other hub.
        hub.handle_command(
            &Command::Switch {
                seq: 1,
                switch: SwitchId::A,
                position: SwitchPosition::Diverging,
            }
            .encode(),
        )
        .await;
        // Garbage tuple.
        hub.handle_command(&[WireValue::Int(1), WireValue::Int(2)])
            .await;
        // A train command on the shared channel.
        hub.handle_command(
            &Command::Stop {
                seq: 2,
                train: rail_types::TrainId::Csx,
            }
            .encode(),
        )
        .await;

        assert_eq!(drives_b.load(Ordering::Relaxed), 0);
        assert_eq!(drives_c.load(Ordering::Relaxed), 0);
        assert_eq!(hub.status_seq, 0);
    }

    #[tokio::test]
    async fn fresh_commands_each_actuate() {
        let (mut hub, drives_b, _) = test_hub().await;
        for seq in 1..=3 {
            hub.handle_command(
                &Command::Switch {
                    seq,
                    switch: SwitchId::B,
                    position: if seq % 2 == 0 {
                        SwitchPosition::Straight
                    } else {
                        SwitchPosition::Diverging
                    },
                }
                .encode(),
            )
            .await;
        }
        assert_eq!(drives_b.load(Ordering::Relaxed), 3);
        assert_eq!(hub.status_seq, 3);
    }
}
