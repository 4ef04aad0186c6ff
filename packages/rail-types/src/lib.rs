//! # rail-types
//!
//! Shared vocabulary for the Railyard layout controller.
//!
//! These types are used by:
//! - `railyard-leader`: planning routes, encoding commands, decoding status
//! - `hub-simulator`: the switch and train follower hubs
//!
//! ## Wire Conventions
//!
//! The broadcast medium carries small ordered tuples of primitives (integers
//! and short string tags) wrapped in a per-channel JSON envelope. Encoding is
//! pure; decoding rejects malformed tuples silently (`None`), per the
//! drop-at-the-boundary policy.
//!
//! ## Invariants
//! - Every originator's `seq` is strictly increasing; receivers dedupe on
//!   (channel, seq) with a bounded FIFO ledger
//! - Color and movement codes are stable: NONE=0 RED=1 YELLOW=2 GREEN=3
//!   BLUE=4 GRAY=5 WHITE=6; STOPPED=0 FORWARD=1 BACKWARD=2

pub mod channel;
pub mod dedup;
pub mod frame;
pub mod ids;
pub mod layout;
pub mod wire;

pub use channel::{COMMAND_CHANNEL, switch_status_channel};
pub use dedup::{DedupLedger, Freshness};
pub use frame::{Command, Status};
pub use ids::{Color, Direction, Movement, SwitchId, SwitchPosition, TrainId};
pub use layout::{City, Layout, LayoutError, Segment};
pub use wire::{Envelope, WireValue};
