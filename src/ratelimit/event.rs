//! Recorded request observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cost class of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    /// Full cost
    #[default]
    Standard,
    /// Roughly a tenth of the load of a standard request
    Discounted,
}

impl RequestClass {
    /// Divisor applied to the cost of a discounted request.
    pub const DISCOUNT_DIVISOR: u64 = 10;

    /// Cost this class contributes to a window sum for a request of `cost`.
    pub fn weighted_cost(&self, cost: u64) -> u64 {
        match self {
            RequestClass::Standard => cost,
            RequestClass::Discounted => cost / Self::DISCOUNT_DIVISOR,
        }
    }
}

/// A single request as seen by the limiter.
///
/// Events are immutable once created; the timestamp is owned by the event, so
/// nothing the caller does afterwards can move it in or out of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    address: String,
    timestamp: DateTime<Utc>,
    cost: u64,
    class: RequestClass,
}

impl RequestEvent {
    /// Create a new event.
    pub fn new(
        address: impl Into<String>,
        timestamp: DateTime<Utc>,
        cost: u64,
        class: RequestClass,
    ) -> Self {
        Self {
            address: address.into(),
            timestamp,
            cost,
            class,
        }
    }

    /// The originating client address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// When the request was recorded.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Undiscounted size proxy of the request.
    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn class(&self) -> RequestClass {
        self.class
    }

    /// Cost after applying the class discount.
    pub fn weighted_cost(&self) -> u64 {
        self.class.weighted_cost(self.cost)
    }
}
