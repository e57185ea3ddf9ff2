//! Database models for rates.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use crate::types::{NewRate, Rate};

/// Row returned by inserts into `rates`.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::storage::schema::rates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RateDB {
    pub id: i32,
    pub ask: Decimal,
    pub bid: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Insert model; `id` and `timestamp` come from column defaults.
#[derive(Insertable, Debug, Clone, Copy)]
#[diesel(table_name = crate::storage::schema::rates)]
pub struct NewRateDB {
    pub ask: Decimal,
    pub bid: Decimal,
}

impl From<NewRate> for NewRateDB {
    fn from(rate: NewRate) -> Self {
        NewRateDB {
            ask: rate.ask,
            bid: rate.bid,
        }
    }
}

impl From<RateDB> for Rate {
    fn from(db: RateDB) -> Self {
        Rate {
            id: db.id,
            ask: db.ask,
            bid: db.bid,
            timestamp: db.timestamp,
        }
    }
}
