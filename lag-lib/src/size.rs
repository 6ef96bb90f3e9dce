//! Human readable byte sizes, such as `500MB` or `2 gb`.

use std::{fmt, str::FromStr};

/// Binary size unit, each a power of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    B,
    KB,
    MB,
    GB,
}

impl SizeUnit {
    pub const fn multiplier(self) -> u64 {
        match self {
            Self::B => 1,
            Self::KB => 1 << 10,
            Self::MB => 1 << 20,
            Self::GB => 1 << 30,
        }
    }
}

impl FromStr for SizeUnit {
    type Err = ParseSizeError;

    /// Expects an uppercase unit token.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B" => Ok(Self::B),
            "KB" => Ok(Self::KB),
            "MB" => Ok(Self::MB),
            "GB" => Ok(Self::GB),
            _ => Err(ParseSizeError::InvalidUnit),
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ParseSizeError {
    /// The input is not of the form `<number><unit>`.
    InvalidFormat(&'static str),
    /// The unit is not one of `B`, `KB`, `MB` or `GB`.
    InvalidUnit,
}

impl fmt::Display for ParseSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseSizeError::InvalidFormat(reason) => f.write_str(reason),
            ParseSizeError::InvalidUnit => f.write_str("invalid data unit"),
        }
    }
}

impl std::error::Error for ParseSizeError {}

/// Parse a size string (e.g. `1.5MB`) into an exact byte count.
///
/// Units are case-insensitive and mandatory, surrounding whitespace is ignored.
/// Fractional results are truncated towards zero.
pub fn parse_size(input: &str) -> Result<u64, ParseSizeError> {
    let input = input.trim().to_ascii_uppercase();

    let split = input
        .find(|c: char| c.is_alphabetic())
        .ok_or(ParseSizeError::InvalidFormat("invalid data size format"))?;
    let (number, unit) = input.split_at(split);

    let value: f64 = number
        .trim_end()
        .parse()
        .map_err(|_| ParseSizeError::InvalidFormat("invalid data size"))?;
    if value < 0. {
        return Err(ParseSizeError::InvalidFormat("negative data size"));
    }

    let unit: SizeUnit = unit.parse()?;

    // float to int casts saturate, so oversized input ends up as u64::MAX
    Ok((value * unit.multiplier() as f64) as u64)
}
