//! Currency-tagged price extraction from free text

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Amount with optional thousands separators and up to two decimals
const AMOUNT: &str = r"\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?";

/// Finds prices written as `£1,250`, `$99.50` or `1200 GBP`.
///
/// Bare numbers are ignored: "4 wheels" or "5 tries" must never be read
/// as an offer.
#[derive(Clone, Debug)]
pub struct PriceExtractor {
    pattern: Regex,
}

impl PriceExtractor {
    pub fn new() -> Self {
        let pattern = format!(
            r"(?i)[£$€]\s?(?P<prefixed>{amount})|(?P<suffixed>{amount})\s?(?:GBP|USD|EUR)\b",
            amount = AMOUNT
        );
        Self {
            pattern: Regex::new(&pattern).expect("price pattern is valid"),
        }
    }

    /// Every currency-tagged amount in `text`, in order of appearance
    pub fn candidates(&self, text: &str) -> Vec<Decimal> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.name("prefixed").or_else(|| caps.name("suffixed")))
            .filter_map(|m| Decimal::from_str(&m.as_str().replace(',', "")).ok())
            .collect()
    }

    /// The lowest currency-tagged amount in `text`, if any.
    ///
    /// Several prices in one message resolve to the lowest, so
    /// "I can do £1300, maybe £1250" reads as 1250.
    pub fn extract(&self, text: &str) -> Option<Decimal> {
        self.candidates(text).into_iter().min()
    }
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new()
    }
}
