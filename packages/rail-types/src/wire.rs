//! wire.rs — untyped broadcast tuples and the UDP envelope.
//!
//! The medium carries ordered tuples of small integers and short string tags.
//! An [`Envelope`] pairs one tuple with its channel number and is what
//! actually crosses the wire, as a JSON datagram. Anything that fails to
//! parse is dropped silently by the caller; nothing here panics on input.

use serde::{Deserialize, Serialize};

/// One primitive slot of a broadcast tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Int(i64),
    Str(String),
}

impl WireValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(s) => Some(s),
        }
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// A tuple tagged with its broadcast channel — the UDP datagram payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub channel: u8,
    pub data: Vec<WireValue>,
}

impl Envelope {
    pub fn new(channel: u8, data: Vec<WireValue>) -> Self {
        Self { channel, data }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// `None` on malformed input; the datagram is simply dropped.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip() {
        let env = Envelope::new(
            1,
            vec![WireValue::Int(7), "SWITCH_B".into(), WireValue::Int(1)],
        );
        let bytes = env.to_bytes().unwrap();
        assert_eq!(Envelope::from_bytes(&bytes), Some(env));
    }

    #[test]
    fn malformed_bytes_are_dropped() {
        assert_eq!(Envelope::from_bytes(b"not json"), None);
        assert_eq!(Envelope::from_bytes(b"{\"channel\":1}"), None);
        assert_eq!(Envelope::from_bytes(b""), None);
    }

    #[test]
    fn slot_accessors() {
        assert_eq!(WireValue::Int(3).as_int(), Some(3));
        assert_eq!(WireValue::Int(3).as_str(), None);
        let s: WireValue = "TRAIN_CN".into();
        assert_eq!(s.as_str(), Some("TRAIN_CN"));
        assert_eq!(s.as_int(), None);
    }
}
