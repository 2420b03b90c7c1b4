//! Point-in-time stock reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remaining stock as read from the stock service, plus the opening instant for
/// reservation-window products. Built fresh for every check and never cached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub remaining: i64,
    pub reservation_opens_at: Option<DateTime<Utc>>,
}

impl StockSnapshot {
    /// Snapshot of a direct-sale product (no opening instant).
    pub fn direct(remaining: i64) -> Self {
        Self {
            remaining,
            reservation_opens_at: None,
        }
    }

    pub fn reservation(remaining: i64, opens_at: Option<DateTime<Utc>>) -> Self {
        Self {
            remaining,
            reservation_opens_at: opens_at,
        }
    }

    /// `true` unless an opening instant is set and strictly after `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        match self.reservation_opens_at {
            Some(opens_at) => opens_at <= now,
            None => true,
        }
    }

    /// `true` when `quantity` units can be taken; taking the last unit is allowed.
    pub fn covers(&self, quantity: u32) -> bool {
        self.remaining >= i64::from(quantity)
    }
}
