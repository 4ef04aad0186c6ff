//! channel.rs — fixed broadcast channel assignments.
//!
//! One shared command channel (leader → everyone), one status channel per
//! originator. Every node subscribes to its relevant subset at boot and
//! ignores the rest.

use crate::ids::TrainId;

/// Leader → all hubs.
pub const COMMAND_CHANNEL: u8 = 1;

/// Switch hub `n` (1..=5) broadcasts status on `10 + n`.
pub const SWITCH_STATUS_BASE: u8 = 10;

/// Train status channels start above this; see [`TrainId::status_channel`].
pub const TRAIN_STATUS_BASE: u8 = 20;

pub const SWITCH_HUB_COUNT: u8 = 5;

pub fn switch_status_channel(hub_index: u8) -> u8 {
    SWITCH_STATUS_BASE + hub_index
}

pub fn is_switch_status(channel: u8) -> bool {
    (SWITCH_STATUS_BASE + 1..=SWITCH_STATUS_BASE + SWITCH_HUB_COUNT).contains(&channel)
}

pub fn is_train_status(channel: u8) -> bool {
    TrainId::ALL.iter().any(|t| t.status_channel() == channel)
}

/// Everything the leader listens to: all switch and train status channels.
pub fn leader_observe_channels() -> Vec<u8> {
    (1..=SWITCH_HUB_COUNT)
        .map(switch_status_channel)
        .chain(TrainId::ALL.iter().map(|t| t.status_channel()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_plan() {
        assert_eq!(switch_status_channel(1), 11);
        assert_eq!(switch_status_channel(5), 15);
        assert!(is_switch_status(13));
        assert!(!is_switch_status(16));
        assert!(is_train_status(21));
        assert!(!is_train_status(11));
        assert_eq!(leader_observe_channels().len(), 10);
    }
}
