//! Fixed-point money amount with two decimal places.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Integer digits allowed before the decimal point (NUMERIC(10, 2)).
const MAX_INTEGER_DIGITS: usize = 8;

/// A non-negative price stored as a whole number of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i64);

impl Price {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Price {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.starts_with('-') {
            return Err("Ensure this value is greater than or equal to 0.".to_string());
        }
        let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
            return Err("A valid number is required.".to_string());
        }
        if fraction.len() > 2 {
            return Err("Ensure that there are no more than 2 decimal places.".to_string());
        }
        let whole = whole.trim_start_matches('0');
        if whole.len() > MAX_INTEGER_DIGITS {
            return Err(format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                MAX_INTEGER_DIGITS
            ));
        }
        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| "A valid number is required.".to_string())?
        };
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().unwrap_or(0) * 10,
            _ => fraction.parse::<i64>().unwrap_or(0),
        };
        Ok(Self(units * 100 + cents))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
