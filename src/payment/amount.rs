//! Fixed-point amounts and payment timestamps.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Scale of conversion rates (1e18).
pub const PRECISE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Sign convention of the amount a provider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountSign {
    /// Plain positive amount, e.g. `5.00`.
    #[default]
    Positive,
    /// Outgoing payments reported as negative, e.g. `-5.00`.
    Negative,
}

/// How a provider encodes the payment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// ISO-8601 date-time; naive values are UTC.
    #[default]
    IsoDateTime,
    /// ISO-8601 calendar date, taken as midnight UTC.
    IsoDate,
    /// Unix time in seconds.
    UnixSeconds,
    /// Unix time in milliseconds.
    UnixMillis,
}

/// Parse a decimal amount into an integer with `decimals` fractional digits.
///
/// Accepts digits, optional `,` thousands grouping and at most one `.`.
/// More fractional digits than `decimals` is an error rather than a silent
/// truncation.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] for anything else, a sign that does not
/// match `sign`, or overflow.
pub fn parse_fixed_point(s: &str, decimals: u8, sign: AmountSign) -> Result<u128> {
    let unsigned = match sign {
        AmountSign::Positive => {
            if s.starts_with('-') {
                return Err(Error::invalid("amount", "negative amount"));
            }
            s
        }
        AmountSign::Negative => s
            .strip_prefix('-')
            .ok_or_else(|| Error::invalid("amount", "expected an outgoing (negative) amount"))?,
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    check_grouping(int_part)?;

    let mut value: u128 = 0;
    for c in int_part.bytes().filter(|c| *c != b',') {
        value = push_digit(value, c)?;
    }

    let mut frac_digits = 0u32;
    if let Some(frac_part) = frac_part {
        if frac_part.is_empty() {
            return Err(Error::invalid("amount", "missing digits after decimal point"));
        }
        for c in frac_part.bytes() {
            value = push_digit(value, c)?;
            frac_digits += 1;
        }
    }

    let decimals = u32::from(decimals);
    if frac_digits > decimals {
        return Err(Error::invalid(
            "amount",
            format!("{frac_digits} decimal places, at most {decimals} allowed"),
        ));
    }

    10u128
        .checked_pow(decimals - frac_digits)
        .and_then(|scale| value.checked_mul(scale))
        .ok_or_else(|| Error::invalid("amount", "overflow"))
}

fn check_grouping(int_part: &str) -> Result<()> {
    if int_part.is_empty() {
        return Err(Error::invalid("amount", "missing integer digits"));
    }
    if !int_part.contains(',') {
        return Ok(());
    }
    let mut groups = int_part.split(',');
    let first_ok = groups.next().is_some_and(|g| (1..=3).contains(&g.len()));
    if first_ok && groups.all(|g| g.len() == 3) {
        Ok(())
    } else {
        Err(Error::invalid("amount", format!("bad digit grouping in {int_part:?}")))
    }
}

fn push_digit(value: u128, c: u8) -> Result<u128> {
    if !c.is_ascii_digit() {
        return Err(Error::invalid("amount", format!("unexpected character {:?}", c as char)));
    }
    value
        .checked_mul(10)
        .and_then(|v| v.checked_add(u128::from(c - b'0')))
        .ok_or_else(|| Error::invalid("amount", "overflow"))
}

/// Minimum fiat payment for an intent: `floor(intent_amount × rate / 1e18)`.
///
/// Computed without an intermediate 256-bit product by splitting
/// `intent_amount` around [`PRECISE_UNIT`].
///
/// # Errors
///
/// Returns [`Error::InvalidField`] if the result does not fit in `u128`.
pub fn required_payment(intent_amount: u128, conversion_rate: u128) -> Result<u128> {
    let whole = intent_amount / PRECISE_UNIT;
    let rem = intent_amount % PRECISE_UNIT;
    let high = whole.checked_mul(conversion_rate);
    let low = rem.checked_mul(conversion_rate).map(|v| v / PRECISE_UNIT);
    high.zip(low)
        .and_then(|(high, low)| high.checked_add(low))
        .ok_or_else(|| Error::invalid("conversion rate", "required payment overflows"))
}

/// Convert a provider timestamp to Unix seconds.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] if `s` does not match `format` or lies
/// before the Unix epoch.
pub fn parse_timestamp(s: &str, format: TimestampFormat) -> Result<u64> {
    let seconds = match format {
        TimestampFormat::IsoDateTime => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .or_else(|_| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|dt| dt.and_utc().timestamp())
            })
            .map_err(|e| Error::invalid("timestamp", format!("{s:?}: {e}")))?,
        TimestampFormat::IsoDate => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| Error::invalid("timestamp", format!("{s:?} is not a date")))?,
        TimestampFormat::UnixSeconds => return parse_unix(s),
        TimestampFormat::UnixMillis => return parse_unix(s).map(|ms| ms / 1000),
    };
    u64::try_from(seconds).map_err(|_| Error::invalid("timestamp", "before Unix epoch"))
}

fn parse_unix(s: &str) -> Result<u64> {
    if s.is_empty() || !s.bytes().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid("timestamp", format!("{s:?} is not an integer")));
    }
    s.parse()
        .map_err(|e| Error::invalid("timestamp", format!("{s:?}: {e}")))
}
