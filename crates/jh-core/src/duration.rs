//! Hold durations and their textual span representation.
//!
//! Spans render as `72h3m0s`, `1.5s`, `250ms` and so on: hours and minutes
//! appear only when non-zero (minutes always follow hours), seconds carry an
//! exact decimal fraction, and sub-second spans switch to `ms`/`µs`/`ns`.
//! [`parse_span`] accepts everything [`format_span`] produces, so a rendered
//! duration can always be read back to the exact same [`TimeDelta`].

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::sentinel::NOT_APPLICABLE;
use crate::timestamp::Timestamp;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Longest fraction we read; anything past nanosecond precision is noise.
const MAX_FRACTION_DIGITS: usize = 18;

/// Errors from [`parse_span`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpanParseError {
    #[error("empty duration")]
    Empty,
    #[error("invalid number in duration {0:?}")]
    InvalidNumber(String),
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("duration {0:?} out of range")]
    Overflow(String),
}

/// How long an issue sat in a state before its next recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldDuration {
    /// Time until the next event.
    Elapsed(TimeDelta),
    /// No valid next event exists.
    NotApplicable,
}

impl HoldDuration {
    /// Elapsed time from `start` to `end`, or [`HoldDuration::NotApplicable`]
    /// without an end.
    pub fn between(start: &Timestamp, end: Option<&Timestamp>) -> Self {
        end.map_or(Self::NotApplicable, |end| {
            Self::Elapsed(end.signed_duration_since(*start))
        })
    }

    /// Returns the elapsed span, if any.
    pub const fn elapsed(&self) -> Option<TimeDelta> {
        match self {
            Self::Elapsed(delta) => Some(*delta),
            Self::NotApplicable => None,
        }
    }
}

impl fmt::Display for HoldDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elapsed(delta) => f.write_str(&format_span(*delta)),
            Self::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

impl FromStr for HoldDuration {
    type Err = SpanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NOT_APPLICABLE {
            return Ok(Self::NotApplicable);
        }
        parse_span(s).map(Self::Elapsed)
    }
}

impl Serialize for HoldDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Renders a span such as `24h0m0s` or `1.5ms`.
pub fn format_span(delta: TimeDelta) -> String {
    if delta.is_zero() {
        return "0s".to_string();
    }

    let mut out = String::new();
    if delta < TimeDelta::zero() {
        out.push('-');
    }
    let abs = delta.abs();
    let secs = abs.num_seconds().unsigned_abs();
    let nanos = abs.subsec_nanos().unsigned_abs();

    if secs == 0 {
        let (unit, scale, width) = if nanos < 1_000 {
            ("ns", 1, 0)
        } else if nanos < 1_000_000 {
            ("µs", 1_000, 3)
        } else {
            ("ms", 1_000_000, 6)
        };
        push_decimal(&mut out, u64::from(nanos / scale), nanos % scale, width);
        out.push_str(unit);
        return out;
    }

    let hours = secs / 3600;
    let minutes = secs % 3600 / 60;
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    push_decimal(&mut out, secs % 60, nanos, 9);
    out.push('s');
    out
}

fn push_decimal(out: &mut String, whole: u64, fraction: u32, width: usize) {
    let _ = write!(out, "{whole}");
    if fraction > 0 {
        let digits = format!("{fraction:0width$}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
}

/// Parses a span produced by [`format_span`] (or any sequence of
/// `<number><unit>` terms with units `h`, `m`, `s`, `ms`, `us`/`µs`, `ns`).
pub fn parse_span(input: &str) -> Result<TimeDelta, SpanParseError> {
    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(SpanParseError::Empty);
    }

    let overflow = || SpanParseError::Overflow(input.to_string());
    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        let (whole, after) = split_digits(rest);
        let (fraction, after) = match after.strip_prefix('.') {
            Some(after_dot) => split_digits(after_dot),
            None => ("", after),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(SpanParseError::InvalidNumber(input.to_string()));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            "" => return Err(SpanParseError::MissingUnit(input.to_string())),
            other => {
                return Err(SpanParseError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                });
            }
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut component = whole.checked_mul(scale).ok_or_else(overflow)?;

        if !fraction.is_empty() {
            let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
            let digits = u32::try_from(fraction.len()).map_err(|_| overflow())?;
            let numerator: u128 = fraction.parse().map_err(|_| overflow())?;
            component = component
                .checked_add(numerator * scale / 10u128.pow(digits))
                .ok_or_else(overflow)?;
        }

        total_nanos = total_nanos.checked_add(component).ok_or_else(overflow)?;
        rest = after;
    }

    let secs = i64::try_from(total_nanos / NANOS_PER_SEC).map_err(|_| overflow())?;
    let nanos = u32::try_from(total_nanos % NANOS_PER_SEC).map_err(|_| overflow())?;
    let delta = TimeDelta::new(secs, nanos).ok_or_else(overflow)?;
    Ok(if negative { -delta } else { delta })
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}
