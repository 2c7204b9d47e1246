//! Lexical helpers for the built-in atomic types
//!
//! Every parser returns the reason of a lexical failure as a plain string;
//! callers decide whether that becomes a validation error (decoding text) or
//! a coercion error (encoding a native value).

use base64::Engine;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

/// Result of a lexical parse: the value or the failure reason
pub type LexicalResult<T> = std::result::Result<T, String>;

const TZ: &str = r"(Z|[+-](?:(?:0\d|1[0-3]):[0-5]\d|14:00))?";

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid decimal regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("valid integer regex"));
static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid float regex")
});
static HEX_BINARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{2})*$").expect("valid hexBinary regex"));
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("valid duration regex")
});
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(-?\d{{4,}})-(\d{{2}})-(\d{{2}}){}$", TZ)).expect("valid date regex")
});
static DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(-?\d{{4,}})-(\d{{2}})-(\d{{2}})T(\d{{2}}):(\d{{2}}):(\d{{2}}(?:\.\d+)?){}$",
        TZ
    ))
    .expect("valid dateTime regex")
});
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(\d{{2}}):(\d{{2}}):(\d{{2}}(?:\.\d+)?){}$", TZ)).expect("valid time regex")
});
static GYEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^-?\d{{4,}}{}$", TZ)).expect("valid gYear regex"));
static GYEAR_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^-?\d{{4,}}-(0[1-9]|1[0-2]){}$", TZ)).expect("valid gYearMonth regex")
});
static GMONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--(0[1-9]|1[0-2]){}$", TZ)).expect("valid gMonth regex"));
static GMONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^--(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01]){}$", TZ))
        .expect("valid gMonthDay regex")
});
static YEAR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})(-\d{2})?").expect("valid year prefix regex"));
static GDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^---(0[1-9]|[12]\d|3[01]){}$", TZ)).expect("valid gDay regex")
});

// =============================================================================
// Boolean
// =============================================================================

/// Parse an XSD boolean literal
pub fn parse_boolean(value: &str) -> LexicalResult<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("'{}' is not a valid boolean value", value)),
    }
}

/// Canonical boolean literal
pub fn format_boolean(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// =============================================================================
// Numbers
// =============================================================================

/// Parse an XSD decimal literal (no exponent allowed)
pub fn parse_decimal(value: &str) -> LexicalResult<Decimal> {
    if !DECIMAL.is_match(value) {
        return Err(format!("'{}' is not a valid decimal value", value));
    }
    let unsigned = value.strip_prefix('+').unwrap_or(value);
    let normalized = if unsigned.ends_with('.') {
        &unsigned[..unsigned.len() - 1]
    } else {
        unsigned
    };
    let normalized = if let Some(rest) = normalized.strip_prefix("-.") {
        format!("-0.{}", rest)
    } else if let Some(rest) = normalized.strip_prefix('.') {
        format!("0.{}", rest)
    } else {
        normalized.to_string()
    };
    Decimal::from_str(&normalized).map_err(|_| format!("decimal value '{}' is out of range", value))
}

/// Parse an XSD integer literal
pub fn parse_integer(value: &str) -> LexicalResult<i128> {
    if !INTEGER.is_match(value) {
        return Err(format!("'{}' is not a valid integer value", value));
    }
    let unsigned = value.strip_prefix('+').unwrap_or(value);
    unsigned
        .parse::<i128>()
        .map_err(|_| format!("integer value '{}' is out of the supported range", value))
}

/// Parse an XSD float/double literal
pub fn parse_float(value: &str) -> LexicalResult<f64> {
    match value {
        "NaN" => Ok(f64::NAN),
        "INF" | "+INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        _ if FLOAT.is_match(value) => value
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a valid float value", value)),
        _ => Err(format!("'{}' is not a valid float value", value)),
    }
}

/// Canonical float literal: integral values keep one fractional digit
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Total digits and fraction digits of a decimal, as counted by the
/// `totalDigits` and `fractionDigits` facets
pub fn decimal_digits(value: &Decimal) -> (u32, u32) {
    let normalized = value.normalize();
    let total = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    (total, normalized.scale())
}

// =============================================================================
// Binary
// =============================================================================

/// Decode a hexBinary literal
pub fn parse_hex_binary(value: &str) -> LexicalResult<Vec<u8>> {
    if !HEX_BINARY.is_match(value) {
        return Err(format!("'{}' is not a valid hexadecimal encoding", value));
    }
    (0..value.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&value[i..i + 2], 16).map_err(|_| "invalid hex byte".to_string())
        })
        .collect()
}

/// Canonical (upper case) hexBinary literal
pub fn format_hex_binary(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Decode a base64Binary literal (embedded spaces allowed)
pub fn parse_base64_binary(value: &str) -> LexicalResult<Vec<u8>> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }
    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|_| format!("'{}' is not a valid base64 encoding", value))
}

/// Canonical base64Binary literal
pub fn format_base64_binary(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// =============================================================================
// Dates, times and durations
// =============================================================================

fn parse_offset(tz: Option<regex::Match<'_>>) -> Option<FixedOffset> {
    let tz = tz?.as_str();
    if tz == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let hours: i32 = tz[1..3].parse().ok()?;
    let minutes: i32 = tz[4..6].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn split_seconds(text: &str) -> Option<(u32, u32)> {
    let (secs, frac) = match text.split_once('.') {
        Some((s, f)) => (s, f),
        None => (text, ""),
    };
    let nanos = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().chain(std::iter::repeat('0')).take(9).collect();
        digits.parse().ok()?
    };
    Some((secs.parse().ok()?, nanos))
}

fn check_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

fn check_time(hour: &str, minute: &str, second: &str) -> Option<(NaiveTime, bool)> {
    let (h, m): (u32, u32) = (hour.parse().ok()?, minute.parse().ok()?);
    let (s, nanos) = split_seconds(second)?;
    if h == 24 && m == 0 && s == 0 && nanos == 0 {
        // end of day
        return Some((NaiveTime::from_hms_opt(0, 0, 0)?, true));
    }
    Some((NaiveTime::from_hms_nano_opt(h, m, s, nanos)?, false))
}

/// Validate an xs:date literal
pub fn check_date_literal(value: &str) -> LexicalResult<()> {
    let caps = DATE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid date", value))?;
    check_date(&caps[1], &caps[2], &caps[3])
        .map(|_| ())
        .ok_or_else(|| format!("'{}' is not a valid calendar date", value))
}

/// Validate an xs:dateTime literal
pub fn check_datetime_literal(value: &str) -> LexicalResult<()> {
    temporal_key_datetime(value).map(|_| ())
}

/// Validate an xs:time literal
pub fn check_time_literal(value: &str) -> LexicalResult<()> {
    temporal_key_time(value).map(|_| ())
}

/// Validate one of the Gregorian fragment types (gYear, gMonthDay, ...)
pub fn check_gregorian_literal(type_name: &str, value: &str) -> LexicalResult<()> {
    let regex: &Regex = match type_name {
        "gYear" => &GYEAR,
        "gYearMonth" => &GYEAR_MONTH,
        "gMonth" => &GMONTH,
        "gMonthDay" => &GMONTH_DAY,
        _ => &GDAY,
    };
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid {}", value, type_name))
    }
}

/// Validate an xs:duration literal
pub fn check_duration_literal(value: &str) -> LexicalResult<()> {
    duration_key(value).map(|_| ())
}

fn temporal_key_datetime(value: &str) -> LexicalResult<NaiveDateTime> {
    let invalid = || format!("'{}' is not a valid dateTime", value);
    let caps = DATETIME.captures(value).ok_or_else(invalid)?;
    let date = check_date(&caps[1], &caps[2], &caps[3]).ok_or_else(invalid)?;
    let (time, next_day) = check_time(&caps[4], &caps[5], &caps[6]).ok_or_else(invalid)?;
    let mut local = date.and_time(time);
    if next_day {
        local += chrono::Duration::days(1);
    }
    Ok(normalize_utc(local, parse_offset(caps.get(7))))
}

fn temporal_key_time(value: &str) -> LexicalResult<NaiveDateTime> {
    let invalid = || format!("'{}' is not a valid time", value);
    let caps = TIME.captures(value).ok_or_else(invalid)?;
    let (time, _) = check_time(&caps[1], &caps[2], &caps[3]).ok_or_else(invalid)?;
    let anchor = NaiveDate::from_ymd_opt(1972, 12, 31).ok_or_else(invalid)?;
    Ok(normalize_utc(anchor.and_time(time), parse_offset(caps.get(4))))
}

fn normalize_utc(local: NaiveDateTime, offset: Option<FixedOffset>) -> NaiveDateTime {
    match offset.and_then(|tz| tz.from_local_datetime(&local).single()) {
        Some(dt) => dt.naive_utc(),
        None => local,
    }
}

fn duration_key(value: &str) -> LexicalResult<(i64, Decimal)> {
    let invalid = || format!("'{}' is not a valid duration", value);
    let caps = DURATION.captures(value).ok_or_else(invalid)?;
    if value.ends_with('P') || value.ends_with('T') {
        return Err(invalid());
    }
    let num = |i: usize| -> i64 { caps.get(i).and_then(|m| m.as_str().parse().ok()).unwrap_or(0) };
    let months = num(2) * 12 + num(3);
    let seconds = caps
        .get(7)
        .and_then(|m| Decimal::from_str(m.as_str()).ok())
        .unwrap_or_default();
    let seconds = seconds + Decimal::from(num(4) * 86400 + num(5) * 3600 + num(6) * 60);
    if caps.get(1).is_some() {
        Ok((-months, -seconds))
    } else {
        Ok((months, seconds))
    }
}

/// Order two temporal literals of the same type; `None` when not comparable
pub fn compare_temporal(type_name: &str, a: &str, b: &str) -> Option<Ordering> {
    match type_name {
        "dateTime" => Some(temporal_key_datetime(a).ok()?.cmp(&temporal_key_datetime(b).ok()?)),
        "time" => Some(temporal_key_time(a).ok()?.cmp(&temporal_key_time(b).ok()?)),
        "date" => {
            let key = |v: &str| -> Option<NaiveDate> {
                let caps = DATE.captures(v)?;
                check_date(&caps[1], &caps[2], &caps[3])
            };
            Some(key(a)?.cmp(&key(b)?))
        }
        "duration" => {
            let (ma, sa) = duration_key(a).ok()?;
            let (mb, sb) = duration_key(b).ok()?;
            match (ma.cmp(&mb), sa.cmp(&sb)) {
                (x, y) if x == y => Some(x),
                (Ordering::Equal, y) => Some(y),
                (x, Ordering::Equal) => Some(x),
                _ => None,
            }
        }
        "gYear" | "gYearMonth" => {
            let year = |v: &str| -> Option<(i64, String)> {
                let caps = YEAR_PREFIX.captures(v)?;
                let month = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
                Some((caps[1].parse().ok()?, month))
            };
            Some(year(a)?.cmp(&year(b)?))
        }
        _ => Some(a.cmp(b)),
    }
}

// =============================================================================
// Tests
// =============================================================================
