//! Spray-and-wait replica accounting.
//!
//! Every message carries the number of copies its holder may still hand
//! out under [`COPIES_PROPERTY`]:
//!
//! | Event | Binary | Standard |
//! |---|---|---|
//! | created | `initial` | `initial` |
//! | sender after handoff | `floor(n / 2)` | `n - 1` |
//! | receiver of `n` | `ceil(n / 2)` | `1` |
//!
//! A holder down to one copy waits for direct delivery.

use tracing::warn;

use crate::error::{Error, Result};
use crate::{Message, PropertyValue};

/// Message property key holding the replica count.
pub const COPIES_PROPERTY: &str = "tidal.copies";

/// Copy-splitting rules for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaPolicy {
    initial_copies: u32,
    binary: bool,
}

impl ReplicaPolicy {
    pub fn new(initial_copies: u32, binary: bool) -> Self {
        Self {
            initial_copies,
            binary,
        }
    }

    /// Copies stamped on a new message.
    pub fn initial_copies(&self) -> u32 {
        self.initial_copies
    }

    /// Whether copies are halved on handoff.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Copies the sender keeps after handing one off.
    pub fn sender_residual(&self, copies: u32) -> u32 {
        if self.binary {
            copies / 2
        } else {
            copies.saturating_sub(1)
        }
    }

    /// Copies the receiver starts with, given the count that arrived.
    pub fn receiver_share(&self, received: u32) -> u32 {
        if self.binary {
            received.div_ceil(2)
        } else {
            1
        }
    }

    /// Stamp the initial replica count.
    pub fn stamp(&self, message: &mut Message) {
        set_copies(message, self.initial_copies);
    }
}

/// Read the replica count of `message`.
///
/// A missing, non-integer or negative count means the message was not
/// produced under this scheme.
pub fn copies(message: &Message) -> Result<u32> {
    let reason = match message.property(COPIES_PROPERTY) {
        Some(PropertyValue::Int(n)) => match u32::try_from(*n) {
            Ok(n) => return Ok(n),
            Err(_) => format!("replica count {} out of range", n),
        },
        Some(other) => format!("replica count has wrong type: {:?}", other),
        None => "no replica count".to_string(),
    };

    warn!(message = %message.id, %reason, "Message is not a spray-and-wait message");
    Err(Error::ProtocolViolation {
        message: message.id.clone(),
        reason,
    })
}

/// Overwrite the replica count of `message`.
pub fn set_copies(message: &mut Message, copies: u32) {
    message.update_property(COPIES_PROPERTY, PropertyValue::Int(i64::from(copies)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;
    use tidal_contact::NodeAddr;

    fn message() -> Message {
        Message::new(MessageId::new("M1"), NodeAddr(0), NodeAddr(9), 1, 0)
    }

    #[test]
    fn binary_split() {
        let policy = ReplicaPolicy::new(4, true);
        assert_eq!(policy.sender_residual(4), 2);
        assert_eq!(policy.receiver_share(4), 2);
        assert_eq!(policy.sender_residual(5), 2);
        assert_eq!(policy.receiver_share(5), 3);
        assert_eq!(policy.sender_residual(2), 1);
        assert_eq!(policy.receiver_share(2), 1);
    }

    #[test]
    fn standard_decrement() {
        let policy = ReplicaPolicy::new(5, false);
        assert_eq!(policy.sender_residual(5), 4);
        assert_eq!(policy.receiver_share(5), 1);
        assert_eq!(policy.sender_residual(0), 0);
    }

    #[test]
    fn copies_round_trip() {
        let mut msg = message();
        ReplicaPolicy::new(7, true).stamp(&mut msg);
        assert_eq!(copies(&msg).unwrap(), 7);

        set_copies(&mut msg, 3);
        assert_eq!(copies(&msg).unwrap(), 3);
    }

    #[test]
    fn missing_or_malformed_count_is_violation() {
        let mut msg = message();
        assert!(matches!(copies(&msg), Err(Error::ProtocolViolation { .. })));

        msg.update_property(COPIES_PROPERTY, PropertyValue::Text("four".into()));
        assert!(matches!(copies(&msg), Err(Error::ProtocolViolation { .. })));

        msg.update_property(COPIES_PROPERTY, PropertyValue::Int(-1));
        assert!(matches!(copies(&msg), Err(Error::ProtocolViolation { .. })));
    }
}
