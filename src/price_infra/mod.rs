pub mod connectors;

use std::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::error::{Error, PriceSide, Result};
use crate::types::NewRate;

/// Raw order book depth as returned by the exchange. Only the first entry on
/// each side is ever consulted.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpstreamQuote {
    #[serde(default)]
    pub asks: Vec<OrderBookEntry>,
    #[serde(default)]
    pub bids: Vec<OrderBookEntry>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct OrderBookEntry {
    pub price: String,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub factor: Option<String>,
    #[serde(default, rename = "type")]
    pub side: Option<String>,
}

impl UpstreamQuote {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| Error::UpstreamMalformed(e.to_string()))
    }

    /// Best ask and best bid as a [`NewRate`].
    pub fn top_of_book(&self) -> Result<NewRate> {
        let (best_ask, best_bid) = match (self.asks.first(), self.bids.first()) {
            (Some(ask), Some(bid)) => (ask, bid),
            _ => return Err(Error::UpstreamEmptyBook),
        };

        let ask = parse_price(PriceSide::Ask, &best_ask.price)?;
        let bid = parse_price(PriceSide::Bid, &best_bid.price)?;
        Ok(NewRate::new(ask, bid))
    }
}

/// Parses a non-negative decimal price string.
///
/// Only digits, `.`, an exponent and signs are accepted. Surrounding
/// whitespace and digit-group separators make the value invalid.
pub fn parse_price(which: PriceSide, raw: &str) -> Result<Decimal> {
    let invalid = || Error::UpstreamPriceParse { which, raw: raw.to_string() };

    if raw.is_empty() || !raw.bytes().all(is_numeric_byte) {
        return Err(invalid());
    }

    let price = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| invalid())?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(invalid());
    }
    Ok(price)
}

fn is_numeric_byte(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn book(asks: &[&str], bids: &[&str]) -> UpstreamQuote {
        let entries = |prices: &[&str]| prices.iter()
            .map(|p| OrderBookEntry { price: p.to_string(), ..OrderBookEntry::default() })
            .collect();
        UpstreamQuote { asks: entries(asks), bids: entries(bids) }
    }

    #[test]
    fn first_entries_win() {
        let rate = book(&["100.5", "101"], &["99.5", "98"]).top_of_book().unwrap();
        assert_eq!(rate, NewRate::new(dec!(100.5), dec!(99.5)));
    }

    #[test]
    fn empty_side_is_reported() {
        assert!(matches!(book(&[], &["1"]).top_of_book(), Err(Error::UpstreamEmptyBook)));
        assert!(matches!(book(&["1"], &[]).top_of_book(), Err(Error::UpstreamEmptyBook)));
    }

    #[test]
    fn unparsable_price_names_side_and_raw_value() {
        match book(&["100"], &["n/a"]).top_of_book() {
            Err(Error::UpstreamPriceParse { which, raw }) => {
                assert_eq!(which, PriceSide::Bid);
                assert_eq!(raw, "n/a");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(matches!(
            parse_price(PriceSide::Ask, "-1.5"),
            Err(Error::UpstreamPriceParse { which: PriceSide::Ask, .. })
        ));
        assert_eq!(parse_price(PriceSide::Ask, "0").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn non_numeric_characters_are_rejected() {
        for raw in [" 100.5 ", "100.5\n", "\t1", "1_000", "1,5", "", "inf", "NaN", "0x10"] {
            assert!(
                matches!(parse_price(PriceSide::Ask, raw), Err(Error::UpstreamPriceParse { .. })),
                "accepted {:?}",
                raw
            );
        }
        assert_eq!(parse_price(PriceSide::Ask, "+5").unwrap(), dec!(5));
    }

    #[test]
    fn padded_top_of_book_names_the_side() {
        match book(&["100.5"], &["1_000"]).top_of_book() {
            Err(Error::UpstreamPriceParse { which, raw }) => {
                assert_eq!(which, PriceSide::Bid);
                assert_eq!(raw, "1_000");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            book(&[" 100.5 "], &["99.5"]).top_of_book(),
            Err(Error::UpstreamPriceParse { which: PriceSide::Ask, .. })
        ));
    }

    #[test]
    fn scientific_notation_is_accepted() {
        assert_eq!(parse_price(PriceSide::Bid, "9.55e1").unwrap(), dec!(95.5));
    }

    #[test]
    fn exchange_payload_decodes() {
        let body = br#"{
            "timestamp": 1700000000,
            "asks": [{"price": "92.41", "volume": "1500.0", "amount": "138615.0", "factor": "0.01", "type": "limit"}],
            "bids": [{"price": "92.3", "volume": "10.0", "amount": "923.0", "factor": "-0.001", "type": "factor"}]
        }"#;

        let quote = UpstreamQuote::from_slice(body).unwrap();
        assert_eq!(quote.asks[0].side.as_deref(), Some("limit"));
        assert_eq!(quote.top_of_book().unwrap(), NewRate::new(dec!(92.41), dec!(92.3)));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(UpstreamQuote::from_slice(b"<html>"), Err(Error::UpstreamMalformed(_))));
        assert!(matches!(
            UpstreamQuote::from_slice(br#"{"asks": [{"price": 1}], "bids": []}"#),
            Err(Error::UpstreamMalformed(_))
        ));
    }

    proptest! {
        #[test]
        fn parsed_price_equals_source_decimal(units in 0u64..10_000_000, scale in 0u32..8) {
            let expected = Decimal::new(units as i64, scale);
            let parsed = parse_price(PriceSide::Ask, &expected.to_string()).unwrap();
            prop_assert_eq!(parsed, expected);
        }

        #[test]
        fn foreign_characters_never_parse(raw in "[0-9]{1,4}[ _,a-dfA-DF-Z\n\t][0-9]{0,3}") {
            prop_assert!(parse_price(PriceSide::Bid, &raw).is_err());
        }
    }
}
