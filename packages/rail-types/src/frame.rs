//! frame.rs — typed command and status frames.
//!
//! The tagged unions here are the only shapes internal code ever handles;
//! raw tuples exist solely at the encode/decode boundary. Both directions are
//! pure functions. Decoders validate length, tags, and code ranges and return
//! `None` for anything malformed — the caller drops the frame silently.
//!
//! Command layouts (channel 1):
//!   switch:        (seq, "SWITCH_X", position)
//!   train stop:    (seq, "TRAIN_T", 0)
//!   train pursue:  (seq, "TRAIN_T", 1|2, len, c0, c1, ...)
//!
//! Status layouts (one channel per originator):
//!   switch hub:    (seq, "A", pos, "B", pos, ...)    full snapshot
//!   train hub:     (seq, "TRAIN_T", color, movement, len, c0, ...)

use crate::ids::{Color, Direction, Movement, SwitchId, SwitchPosition, TrainId};
use crate::wire::WireValue;

/// Train command opcode for STOP. Pursue opcodes come from [`Direction`].
const OP_STOP: i64 = 0;

// ── Commands (leader → hubs) ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Switch {
        seq: i64,
        switch: SwitchId,
        position: SwitchPosition,
    },
    Stop {
        seq: i64,
        train: TrainId,
    },
    Pursue {
        seq: i64,
        train: TrainId,
        direction: Direction,
        pattern: Vec<Color>,
    },
}

impl Command {
    pub fn seq(&self) -> i64 {
        match self {
            Self::Switch { seq, .. } | Self::Stop { seq, .. } | Self::Pursue { seq, .. } => *seq,
        }
    }

    pub fn encode(&self) -> Vec<WireValue> {
        match self {
            Self::Switch {
                seq,
                switch,
                position,
            } => vec![
                WireValue::Int(*seq),
                switch.wire_label().into(),
                WireValue::Int(position.code()),
            ],
            Self::Stop { seq, train } => vec![
                WireValue::Int(*seq),
                train.wire_tag().into(),
                WireValue::Int(OP_STOP),
            ],
            Self::Pursue {
                seq,
                train,
                direction,
                pattern,
            } => {
                let mut data = vec![
                    WireValue::Int(*seq),
                    train.wire_tag().into(),
                    WireValue::Int(direction.opcode()),
                    WireValue::Int(pattern.len() as i64),
                ];
                data.extend(pattern.iter().map(|c| WireValue::Int(c.code())));
                data
            }
        }
    }

    pub fn decode(data: &[WireValue]) -> Option<Self> {
        let seq = data.first()?.as_int()?;
        let tag = data.get(1)?.as_str()?;

        if let Some(switch) = SwitchId::from_wire_label(tag) {
            if data.len() != 3 {
                return None;
            }
            let position = SwitchPosition::from_code(data[2].as_int()?)?;
            return Some(Self::Switch {
                seq,
                switch,
                position,
            });
        }

        let train = TrainId::from_wire_tag(tag)?;
        let op = data.get(2)?.as_int()?;
        if op == OP_STOP {
            if data.len() != 3 {
                return None;
            }
            return Some(Self::Stop { seq, train });
        }

        let direction = Direction::from_opcode(op)?;
        let len = data.get(3)?.as_int()?;
        if len <= 0 || data.len() != 4 + len as usize {
            return None;
        }
        let pattern = data[4..]
            .iter()
            .map(|v| v.as_int().and_then(Color::from_code))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::Pursue {
            seq,
            train,
            direction,
            pattern,
        })
    }
}

// ── Status (hubs → leader) ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Full position snapshot of every switch the hub owns — never a delta,
    /// so one received frame is enough to rebuild the leader's view.
    Switches {
        seq: i64,
        positions: Vec<(SwitchId, SwitchPosition)>,
    },
    /// Empty `pattern` means no active pursuit target.
    Train {
        seq: i64,
        train: TrainId,
        seeing: Color,
        movement: Movement,
        pattern: Vec<Color>,
    },
}

impl Status {
    pub fn seq(&self) -> i64 {
        match self {
            Self::Switches { seq, .. } | Self::Train { seq, .. } => *seq,
        }
    }

    pub fn encode(&self) -> Vec<WireValue> {
        match self {
            Self::Switches { seq, positions } => {
                let mut data = vec![WireValue::Int(*seq)];
                for (switch, position) in positions {
                    data.push(switch.letter().into());
                    data.push(WireValue::Int(position.code()));
                }
                data
            }
            Self::Train {
                seq,
                train,
                seeing,
                movement,
                pattern,
            } => {
                let mut data = vec![
                    WireValue::Int(*seq),
                    train.wire_tag().into(),
                    WireValue::Int(seeing.code()),
                    WireValue::Int(movement.code()),
                    WireValue::Int(pattern.len() as i64),
                ];
                data.extend(pattern.iter().map(|c| WireValue::Int(c.code())));
                data
            }
        }
    }

    pub fn decode(data: &[WireValue]) -> Option<Self> {
        let seq = data.first()?.as_int()?;
        let tag = data.get(1)?.as_str()?;

        if let Some(train) = TrainId::from_wire_tag(tag) {
            let seeing = Color::from_code(data.get(2)?.as_int()?)?;
            let movement = Movement::from_code(data.get(3)?.as_int()?)?;
            let len = data.get(4)?.as_int()?;
            if len < 0 || data.len() != 5 + len as usize {
                return None;
            }
            let pattern = data[5..]
                .iter()
                .map(|v| v.as_int().and_then(Color::from_code))
                .collect::<Option<Vec<_>>>()?;
            return Some(Self::Train {
                seq,
                train,
                seeing,
                movement,
                pattern,
            });
        }

        // Switch snapshot: seq followed by (letter, position) pairs.
        if data.len() < 3 || data.len() % 2 == 0 {
            return None;
        }
        let mut positions = Vec::with_capacity((data.len() - 1) / 2);
        for pair in data[1..].chunks(2) {
            let switch = SwitchId::from_letter(pair[0].as_str()?)?;
            let position = SwitchPosition::from_code(pair[1].as_int()?)?;
            positions.push((switch, position));
        }
        Some(Self::Switches { seq, positions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_command(cmd: Command) {
        assert_eq!(Command::decode(&cmd.encode()), Some(cmd));
    }

    fn round_trip_status(st: Status) {
        assert_eq!(Status::decode(&st.encode()), Some(st));
    }

    #[test]
    fn command_round_trips() {
        round_trip_command(Command::Switch {
            seq: 1,
            switch: SwitchId::A,
            position: SwitchPosition::Diverging,
        });
        round_trip_command(Command::Stop {
            seq: 9,
            train: TrainId::Up,
        });
        round_trip_command(Command::Pursue {
            seq: 10,
            train: TrainId::Csx,
            direction: Direction::Forward,
            pattern: vec![Color::Green, Color::Red],
        });
        round_trip_command(Command::Pursue {
            seq: 11,
            train: TrainId::Cn,
            direction: Direction::Backward,
            pattern: vec![Color::Blue, Color::Green, Color::Yellow, Color::Red],
        });
    }

    #[test]
    fn status_round_trips() {
        round_trip_status(Status::Switches {
            seq: 4,
            positions: vec![
                (SwitchId::A, SwitchPosition::Diverging),
                (SwitchId::B, SwitchPosition::Straight),
            ],
        });
        round_trip_status(Status::Train {
            seq: 5,
            train: TrainId::Bnsf,
            seeing: Color::Gray,
            movement: Movement::Forward,
            pattern: vec![Color::Red, Color::Yellow],
        });
        round_trip_status(Status::Train {
            seq: 6,
            train: TrainId::Ns,
            seeing: Color::None,
            movement: Movement::Stopped,
            pattern: vec![],
        });
    }

    #[test]
    fn malformed_commands_are_rejected() {
        // Too short
        assert_eq!(Command::decode(&[WireValue::Int(1)]), None);
        // Unknown device tag
        assert_eq!(
            Command::decode(&[WireValue::Int(1), "SWITCH_Z".into(), WireValue::Int(0)]),
            None
        );
        // Switch position out of range
        assert_eq!(
            Command::decode(&[WireValue::Int(1), "SWITCH_A".into(), WireValue::Int(2)]),
            None
        );
        // Pursue with truncated pattern
        assert_eq!(
            Command::decode(&[
                WireValue::Int(1),
                "TRAIN_CSX".into(),
                WireValue::Int(1),
                WireValue::Int(3),
                WireValue::Int(1),
            ]),
            None
        );
        // Pursue with an invalid color code
        assert_eq!(
            Command::decode(&[
                WireValue::Int(1),
                "TRAIN_CSX".into(),
                WireValue::Int(1),
                WireValue::Int(1),
                WireValue::Int(9),
            ]),
            None
        );
        // Seq slot holding a string
        assert_eq!(
            Command::decode(&["1".into(), "SWITCH_A".into(), WireValue::Int(0)]),
            None
        );
    }

    #[test]
    fn malformed_status_is_rejected() {
        // Dangling pair member
        assert_eq!(
            Status::decode(&[WireValue::Int(1), "A".into()]),
            None
        );
        // Train status with a bad movement code
        assert_eq!(
            Status::decode(&[
                WireValue::Int(1),
                "TRAIN_UP".into(),
                WireValue::Int(0),
                WireValue::Int(7),
                WireValue::Int(0),
            ]),
            None
        );
        // Negative pattern length
        assert_eq!(
            Status::decode(&[
                WireValue::Int(1),
                "TRAIN_UP".into(),
                WireValue::Int(0),
                WireValue::Int(0),
                WireValue::Int(-1),
            ]),
            None
        );
    }
}
