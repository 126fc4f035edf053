// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;
use std::ops::Deref;
use std::str::FromStr;

/// Represents the parsed result of a JSON number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberResult {
    /// Integer that fits in an `i64`
    Integer(i64),
    /// Integer too large for `i64` (use the raw string for exact representation)
    IntegerOverflow,
    /// Number with a fraction or exponent
    Float(f64),
}

/// A JSON number with both its exact text and a parsed value.
///
/// The text is borrowed from the input window when the number sits in one
/// contiguous piece, and copied when it straddled two segments.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonNumber<'a> {
    raw: Cow<'a, str>,
    parsed: NumberResult,
}

impl<'a> JsonNumber<'a> {
    /// Build from the number's text as delimited by the tokenizer.
    pub fn new(raw: Cow<'a, str>) -> Self {
        let parsed = if is_integer(raw.as_bytes()) {
            match raw.parse::<i64>() {
                Ok(value) => NumberResult::Integer(value),
                Err(_) => NumberResult::IntegerOverflow,
            }
        } else {
            // The tokenizer only lets through grammar-valid numbers
            raw.parse::<f64>()
                .map(NumberResult::Float)
                .unwrap_or(NumberResult::Float(f64::NAN))
        };
        Self { raw, parsed }
    }

    /// Get the parsed NumberResult.
    pub fn parsed(&self) -> NumberResult {
        self.parsed
    }

    /// The value as `i64`, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self.parsed {
            NumberResult::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// The value as `f64`. Overflowing integers are converted from their text.
    pub fn as_f64(&self) -> Option<f64> {
        match self.parsed {
            NumberResult::Float(value) => Some(value),
            NumberResult::Integer(value) => Some(value as f64),
            NumberResult::IntegerOverflow => self.raw.parse().ok(),
        }
    }

    /// The exact number text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parse the number text as a custom type, e.g. `u64` or a big decimal.
    pub fn parse<T: FromStr>(&self) -> Result<T, T::Err> {
        T::from_str(self.as_str())
    }

    /// Check if this number has neither a decimal point nor an exponent.
    pub fn is_integer(&self) -> bool {
        matches!(
            self.parsed,
            NumberResult::Integer(_) | NumberResult::IntegerOverflow
        )
    }

    pub fn is_float(&self) -> bool {
        !self.is_integer()
    }

    /// Detach from the input window.
    pub fn into_owned(self) -> JsonNumber<'static> {
        JsonNumber {
            raw: Cow::Owned(self.raw.into_owned()),
            parsed: self.parsed,
        }
    }
}

impl AsRef<str> for JsonNumber<'_> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for JsonNumber<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl std::fmt::Display for JsonNumber<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.parsed {
            NumberResult::Integer(value) => write!(f, "{value}"),
            NumberResult::Float(value) => write!(f, "{value}"),
            NumberResult::IntegerOverflow => f.write_str(&self.raw),
        }
    }
}

fn is_integer(bytes: &[u8]) -> bool {
    !bytes.iter().any(|&b| matches!(b, b'.' | b'e' | b'E'))
}
