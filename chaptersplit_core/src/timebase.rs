use std::fmt;

use crate::error::BoundaryError;

const DECLARATION_PREFIX: &str = "TIMEBASE=";

/// Rational duration of one container time unit, in seconds.
///
/// Timestamps in a metadata dump are integers counted in these units; the
/// time base converts them to milliseconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeBase {
    numerator: u64,
    denominator: u64,
}

impl TimeBase {
    /// The base in effect before any declaration: raw values are milliseconds.
    pub const MILLISECONDS: TimeBase = TimeBase {
        numerator: 1,
        denominator: 1_000,
    };

    /// Construct a time base. Both parts must be positive.
    pub fn new(numerator: u64, denominator: u64) -> Option<Self> {
        if numerator == 0 || denominator == 0 {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    /// Parse a `TIMEBASE=<numerator>/<denominator>` declaration line.
    ///
    /// Returns `None` for anything that does not match the pattern exactly.
    pub fn parse_declaration(line: &str) -> Option<Self> {
        let value = line.strip_prefix(DECLARATION_PREFIX)?;
        let (numerator, denominator) = value.split_once('/')?;
        Self::new(parse_digits(numerator)?, parse_digits(denominator)?)
    }

    /// Milliseconds per raw unit, `(numerator / denominator) * 1000`.
    pub fn multiplier(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64 * 1_000.0
    }

    /// Convert a raw timestamp to whole milliseconds, rounding down.
    ///
    /// The product is computed exactly, so bases such as `1/44100` do not
    /// lose a millisecond to floating point error.
    pub fn to_millis(&self, raw: u64, field: &'static str) -> Result<u64, BoundaryError> {
        let overflow = || BoundaryError::Overflow { field };
        let scaled = u128::from(raw)
            .checked_mul(u128::from(self.numerator))
            .and_then(|product| product.checked_mul(1_000))
            .ok_or_else(overflow)?
            / u128::from(self.denominator);
        u64::try_from(scaled).map_err(|_| overflow())
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MILLISECONDS
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
