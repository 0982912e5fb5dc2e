//! Order status state machine.
//!
//! ```text
//! processing ──► shipped ──► delivered
//!      │
//!      └───────► cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed and not yet handed to the carrier. Cancellable for a short window.
    #[default]
    Processing,
    /// With the carrier; a tracking number exists.
    Shipped,
    /// Received by the shopper.
    Delivered,
    /// Cancelled by the shopper while processing.
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Returns `true` if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns `true` if `self -> next` is an edge of the lifecycle.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Processing, Self::Shipped | Self::Cancelled) | (Self::Shipped, Self::Delivered)
        )
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
