//! ids.rs — stable device and value identifiers.
//!
//! On the wire a device is a short string tag (`"SWITCH_A"`, `"TRAIN_CSX"`)
//! and every value is a small integer code. The `FromStr` impls exist for the
//! operator CLI surface only; internal code never round-trips through strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Color ─────────────────────────────────────────────────────────────────────

/// Logical sensor palette. Codes are fixed wire constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    None = 0,
    Red = 1,
    Yellow = 2,
    Green = 3,
    Blue = 4,
    Gray = 5,
    White = 6,
}

impl Color {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Red),
            2 => Some(Self::Yellow),
            3 => Some(Self::Green),
            4 => Some(Self::Blue),
            5 => Some(Self::Gray),
            6 => Some(Self::White),
            _ => None,
        }
    }

    /// Only RED/YELLOW/GREEN/BLUE are trustworthy pattern marks; the rest is
    /// track bed, gaps, or sensor confusion.
    pub fn is_pattern_color(self) -> bool {
        matches!(self, Self::Red | Self::Yellow | Self::Green | Self::Blue)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Red => "RED",
            Self::Yellow => "YELLOW",
            Self::Green => "GREEN",
            Self::Blue => "BLUE",
            Self::Gray => "GRAY",
            Self::White => "WHITE",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "RED" => Ok(Self::Red),
            "YELLOW" => Ok(Self::Yellow),
            "GREEN" => Ok(Self::Green),
            "BLUE" => Ok(Self::Blue),
            "GRAY" => Ok(Self::Gray),
            "WHITE" => Ok(Self::White),
            _ => Err(()),
        }
    }
}

/// `RED-YELLOW-GREEN` form used in schedules and the CLI.
pub fn pattern_string(pattern: &[Color]) -> String {
    pattern.iter().map(|c| c.name()).collect::<Vec<_>>().join("-")
}

// ── Switch identity and position ──────────────────────────────────────────────

/// The ten switches of the layout. Each is owned by exactly one follower hub;
/// that mapping is static configuration on the hub side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SwitchId {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
}

impl SwitchId {
    pub const ALL: [SwitchId; 10] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
        Self::I,
        Self::J,
    ];

    /// Command-frame tag, e.g. `"SWITCH_A"`.
    pub fn wire_label(self) -> &'static str {
        match self {
            Self::A => "SWITCH_A",
            Self::B => "SWITCH_B",
            Self::C => "SWITCH_C",
            Self::D => "SWITCH_D",
            Self::E => "SWITCH_E",
            Self::F => "SWITCH_F",
            Self::G => "SWITCH_G",
            Self::H => "SWITCH_H",
            Self::I => "SWITCH_I",
            Self::J => "SWITCH_J",
        }
    }

    /// Status-frame tag: the bare letter.
    pub fn letter(self) -> &'static str {
        &self.wire_label()[7..]
    }

    pub fn from_wire_label(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|sw| sw.wire_label() == s)
    }

    pub fn from_letter(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|sw| sw.letter() == s)
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_label())
    }
}

impl FromStr for SwitchId {
    type Err = ();

    /// Accepts the single-letter CLI form, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_letter(&s.to_ascii_uppercase()).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SwitchPosition {
    Straight = 0,
    Diverging = 1,
}

impl SwitchPosition {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Straight),
            1 => Some(Self::Diverging),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Straight => "STRAIGHT",
            Self::Diverging => "DIVERGING",
        }
    }
}

impl fmt::Display for SwitchPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Train identity ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrainId {
    Csx,
    Up,
    Cn,
    Bnsf,
    Ns,
}

impl TrainId {
    pub const ALL: [TrainId; 5] = [Self::Csx, Self::Up, Self::Cn, Self::Bnsf, Self::Ns];

    /// Command/status-frame tag, e.g. `"TRAIN_CSX"`.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::Csx => "TRAIN_CSX",
            Self::Up => "TRAIN_UP",
            Self::Cn => "TRAIN_CN",
            Self::Bnsf => "TRAIN_BNSF",
            Self::Ns => "TRAIN_NS",
        }
    }

    pub fn short_name(self) -> &'static str {
        &self.wire_tag()[6..]
    }

    pub fn from_wire_tag(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.wire_tag() == s)
    }

    /// Dedicated status channel, 21..=25.
    pub fn status_channel(self) -> u8 {
        crate::channel::TRAIN_STATUS_BASE
            + Self::ALL.iter().position(|t| *t == self).unwrap_or(0) as u8
            + 1
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for TrainId {
    type Err = ();

    /// Accepts the short CLI form (`csx`, `up`, ...), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.short_name() == upper)
            .ok_or(())
    }
}

// ── Movement and pursuit direction ────────────────────────────────────────────

/// What a train hub reports it is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Movement {
    Stopped = 0,
    Forward = 1,
    Backward = 2,
}

impl Movement {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Stopped),
            1 => Some(Self::Forward),
            2 => Some(Self::Backward),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Forward => "FORWARD",
            Self::Backward => "BACKWARD",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pursuit direction of a movement command, and equally the physical facing
/// of a train chassis. Facing changes only by explicit reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Command opcode: FORWARD_UNTIL_PATTERN=1, BACKWARD_UNTIL_PATTERN=2.
    pub fn opcode(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => 2,
        }
    }

    pub fn from_opcode(v: i64) -> Option<Self> {
        match v {
            1 => Some(Self::Forward),
            2 => Some(Self::Backward),
            _ => None,
        }
    }

    pub fn movement(self) -> Movement {
        match self {
            Self::Forward => Movement::Forward,
            Self::Backward => Movement::Backward,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Forward => "FORWARD",
            Self::Backward => "BACKWARD",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
