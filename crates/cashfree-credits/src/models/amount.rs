//! Decimal amount parsing.
//!
//! Amounts arrive as JSON numbers from the gateway and as strings from the
//! ledger file. Numbers are converted through their shortest decimal text,
//! so `249.99` stays `249.99` instead of picking up binary float digits.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = BigDecimal;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a decimal amount as a number or string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<BigDecimal, E> {
        BigDecimal::from_str(value.trim()).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<BigDecimal, E> {
        Ok(BigDecimal::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<BigDecimal, E> {
        Ok(BigDecimal::from(value))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<BigDecimal, E> {
        if !value.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // f64's Display is the shortest text that round-trips.
        BigDecimal::from_str(&value.to_string()).map_err(E::custom)
    }
}

/// Wrapper used to deserialize `Option<BigDecimal>` through [`AmountVisitor`].
struct Amount(BigDecimal);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor).map(Amount)
    }
}

/// `deserialize_with` target for required amounts.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

/// `deserialize_with` target for optional amounts. Pair with `#[serde(default)]`.
pub fn deserialize_option<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BigDecimal>, D::Error> {
    Ok(Option::<Amount>::deserialize(deserializer)?.map(|amount| amount.0))
}
