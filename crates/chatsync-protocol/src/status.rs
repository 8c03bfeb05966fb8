//! Delivery status lattice.
//!
//! The three delivery states form a totally ordered set
//! `sent < delivered < read`. Status transitions are monotone: a message
//! never moves to a lower or equal status, which makes concurrent status
//! updates from history fetches and live events commute.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery status of a message.
///
/// Variant order is the lattice order; `derive(Ord)` depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Accepted by the history store, not yet seen by the receiver's client.
    Sent,
    /// Received by the receiver's client.
    Delivered,
    /// Seen by the receiver. Terminal.
    Read,
}

impl DeliveryStatus {
    /// Status assigned to a freshly created message.
    pub fn initial() -> Self {
        Self::Sent
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Read)
    }

    /// Monotone transition rule: `max(current, proposed)` under the
    /// lattice order. A proposed regression is a no-op.
    pub fn advance(current: Self, proposed: Self) -> Self {
        current.max(proposed)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Delivered => write!(f, "delivered"),
            Self::Read => write!(f, "read"),
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            _ => Err(format!("Unknown delivery status: {}", s)),
        }
    }
}
