//! Order status state machine.
//!
//! ```text
//! processing -> shipped -> out_for_delivery -> delivered
//!      \            \              \
//!       `------------`--------------`--> cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from parsing or transitioning an [`OrderStatus`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The string is not a known status.
    #[error("unknown order status: {0}")]
    Unknown(String),
    /// The transition is not allowed from the current status.
    #[error("cannot change order status from {from} to {to}")]
    Transition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Processing,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether `self -> next` is an edge of the machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::OutForDelivery | Self::Cancelled)
                | (Self::OutForDelivery, Self::Delivered | Self::Cancelled)
        )
    }

    /// Validate `self -> next`, returning `next` on success.
    ///
    /// # Errors
    ///
    /// [`StatusError::Transition`] when the edge does not exist, including
    /// `next == self`.
    pub const fn transition(self, next: Self) -> Result<Self, StatusError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusError::Transition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusError::Unknown(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut status = OrderStatus::Processing;
        for next in [
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            status = status.transition(next).unwrap();
        }
        assert!(status.is_terminal());
    }

    #[test]
    fn test_cancel_only_before_delivery() {
        for from in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
        ] {
            assert!(from.can_transition_to(OrderStatus::Cancelled));
        }
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_are_closed() {
        for from in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            for to in OrderStatus::ALL {
                assert!(from.transition(to).is_err(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_no_skips_or_reversals() {
        assert!(OrderStatus::Processing.transition(OrderStatus::Delivered).is_err());
        assert!(OrderStatus::Shipped.transition(OrderStatus::Processing).is_err());
        assert_eq!(
            OrderStatus::Shipped.transition(OrderStatus::Shipped),
            Err(StatusError::Transition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Shipped,
            })
        );
    }

    #[test]
    fn test_parse_round_trip_and_unknown() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            "refunded".parse::<OrderStatus>(),
            Err(StatusError::Unknown("refunded".into()))
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::OutForDelivery).unwrap(),
            "\"out_for_delivery\""
        );
    }
}
