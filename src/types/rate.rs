use chrono::{DateTime, Utc};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-of-book quote as fetched from the exchange, not yet persisted.
///
/// The timestamp is deliberately absent: it is assigned by the database
/// when the row is inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRate {
    pub ask: Decimal,
    pub bid: Decimal,
}

impl NewRate {
    pub fn new(ask: Decimal, bid: Decimal) -> Self {
        NewRate { ask, bid }
    }
}

/// A persisted quote. Rows are append-only and never read back by the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub id: i32,
    pub ask: Decimal,
    pub bid: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Rate {
    pub fn ask_f64(&self) -> f64 {
        self.ask.to_f64().unwrap_or(f64::NAN)
    }

    pub fn bid_f64(&self) -> f64 {
        self.bid.to_f64().unwrap_or(f64::NAN)
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.timestamp.timestamp()
    }

    pub fn quote(&self) -> NewRate {
        NewRate::new(self.ask, self.bid)
    }
}
