//! Accurate times and spacecraft clock values.
//!
//! ERT, RCT and SCET are carried as milliseconds since the Unix epoch plus a
//! sub-millisecond nanosecond component (0..=999_999). Formatting follows the
//! archive convention: ISO date-time with millisecond digits, followed by as
//! many sub-millisecond digits as the configured precision allows, with
//! trailing zeros beyond the milliseconds suppressed.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Largest sub-millisecond nanosecond component.
pub const MAX_SUB_MILLI_NANOS: u32 = 999_999;

/// Total fractional-second digits carried by an [`AccurateTime`].
pub const MAX_PRECISION: u8 = 9;

const BASE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// A timestamp with sub-millisecond resolution.
///
/// A dummy time stands in for a SCET that was never recorded. It compares as
/// the epoch and formats as an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccurateTime {
    millis: i64,
    nanos: u32,
    dummy: bool,
}

impl AccurateTime {
    /// Create a time from epoch milliseconds and sub-millisecond nanoseconds.
    pub fn new(millis: i64, nanos: u32) -> Result<Self> {
        if nanos > MAX_SUB_MILLI_NANOS {
            return Err(Error::InvalidTime(format!(
                "sub-millisecond nanoseconds must be <= {}, got {}",
                MAX_SUB_MILLI_NANOS, nanos
            )));
        }
        Ok(Self {
            millis,
            nanos,
            dummy: false,
        })
    }

    /// Placeholder for an absent time; never a real value.
    pub fn dummy() -> Self {
        Self {
            millis: 0,
            nanos: 0,
            dummy: true,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    pub fn sub_millis_nanos(&self) -> u32 {
        self.nanos
    }

    /// Format with `precision` fractional digits (3..=9).
    pub fn format(&self, precision: u8) -> String {
        if self.dummy {
            return String::new();
        }
        let base = match DateTime::from_timestamp_millis(self.millis) {
            Some(dt) => dt.format(BASE_FORMAT).to_string(),
            None => return format!("{}ms", self.millis),
        };

        let precision = precision.clamp(3, MAX_PRECISION);
        if precision == 3 {
            return base;
        }

        let mut sub = self.nanos;
        for _ in precision..MAX_PRECISION {
            sub /= 10;
        }
        if sub == 0 {
            return base;
        }

        let width = usize::from(precision - 3);
        let digits = format!("{:0width$}", sub, width = width);
        format!("{}{}", base, digits.trim_end_matches('0'))
    }

    /// Parse `YYYY-MM-DDTHH:MM:SS[.f...]` or `YYYY-DDDTHH:MM:SS[.f...]`.
    ///
    /// Up to nine fractional digits are honored; a trailing `Z` is accepted.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim().trim_end_matches('Z');
        let (base, fraction) = match trimmed.split_once('.') {
            Some((base, fraction)) => (base, fraction),
            None => (trimmed, ""),
        };

        if fraction.len() > usize::from(MAX_PRECISION)
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::InvalidTime(format!("bad fractional seconds in '{}'", text)));
        }

        let naive = NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(base, "%Y-%jT%H:%M:%S"))
            .map_err(|e| Error::InvalidTime(format!("'{}': {}", text, e)))?;

        let mut padded = fraction.to_string();
        while padded.len() < usize::from(MAX_PRECISION) {
            padded.push('0');
        }
        let fractional_nanos: u32 = padded
            .parse()
            .map_err(|_| Error::InvalidTime(format!("bad fractional seconds in '{}'", text)))?;

        let millis = naive.and_utc().timestamp_millis() + i64::from(fractional_nanos / 1_000_000);
        Self::new(millis, fractional_nanos % 1_000_000)
    }
}

/// Bit widths of the coarse and fine SCLK fields for one group of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SclkEncoding {
    pub coarse_bits: u8,
    pub fine_bits: u8,
}

impl SclkEncoding {
    pub fn new(coarse_bits: u8, fine_bits: u8) -> Self {
        Self {
            coarse_bits,
            fine_bits,
        }
    }

    /// Decimal digits needed for the largest coarse value.
    pub fn coarse_digits(&self) -> usize {
        decimal_digits(self.coarse_bits)
    }

    /// Decimal digits needed for the largest fine value.
    pub fn fine_digits(&self) -> usize {
        decimal_digits(self.fine_bits)
    }
}

impl Default for SclkEncoding {
    fn default() -> Self {
        Self {
            coarse_bits: 32,
            fine_bits: 16,
        }
    }
}

fn decimal_digits(bits: u8) -> usize {
    let bits = u32::from(bits.min(64));
    if bits == 0 {
        return 1;
    }
    let max: u128 = (1u128 << bits) - 1;
    max.to_string().len()
}

/// Spacecraft clock value in coarse and fine ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sclk {
    coarse: u64,
    fine: u64,
    dummy: bool,
}

impl Sclk {
    pub fn new(coarse: u64, fine: u64) -> Self {
        Self {
            coarse,
            fine,
            dummy: false,
        }
    }

    /// Placeholder for an absent SCLK.
    pub fn dummy() -> Self {
        Self {
            coarse: 0,
            fine: 0,
            dummy: true,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    pub fn coarse(&self) -> u64 {
        self.coarse
    }

    pub fn fine(&self) -> u64 {
        self.fine
    }

    /// Format as `coarse-fine`, zero padded to the widths of `encoding`.
    ///
    /// Fixed widths keep string order consistent with numeric order.
    pub fn format(&self, encoding: &SclkEncoding) -> String {
        if self.dummy {
            return String::new();
        }
        format!(
            "{:0cw$}-{:0fw$}",
            self.coarse,
            self.fine,
            cw = encoding.coarse_digits(),
            fw = encoding.fine_digits()
        )
    }

    /// Parse `coarse-fine` or `coarse.fine` ticks.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let (coarse, fine) = trimmed
            .split_once(['-', '.'])
            .unwrap_or((trimmed, "0"));
        let coarse = coarse
            .parse::<u64>()
            .map_err(|e| Error::InvalidSclk(format!("'{}': {}", text, e)))?;
        let fine = fine
            .parse::<u64>()
            .map_err(|e| Error::InvalidSclk(format!("'{}': {}", text, e)))?;
        Ok(Self::new(coarse, fine))
    }
}

impl fmt::Display for Sclk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(&SclkEncoding::default()))
    }
}

/// Fractional-second precision used when rendering times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeFormat {
    pub ert_precision: u8,
    pub scet_precision: u8,
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self {
            ert_precision: 7,
            scet_precision: 3,
        }
    }
}

impl TimeFormat {
    pub fn format_ert(&self, time: &AccurateTime) -> String {
        time.format(self.ert_precision)
    }

    pub fn format_scet(&self, time: &AccurateTime) -> String {
        time.format(self.scet_precision)
    }
}
