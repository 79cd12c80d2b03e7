//! Field-level coercion and constraint rules.
//!
//! Each rule takes one raw JSON value and either returns the typed value or a
//! [`Violation`]. Rules know nothing about field names; [`ObjectReader`]
//! attaches the path when it records the violation.
//!
//! [`ObjectReader`]: crate::schema::ObjectReader

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::issue::IssueCode;

/// Largest integer a JSON client can represent exactly (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Naive timestamp layouts accepted in addition to RFC 3339. Read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// A rule failure, before it is tied to a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Classification of the failure.
    pub code: IssueCode,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Creates a violation.
    #[must_use]
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn expected(expected: &str, received: &Value) -> Self {
        Self::new(
            IssueCode::InvalidType,
            format!("Expected {expected}, received {}", type_name(received)),
        )
    }
}

/// Names the JSON type of a value the way clients spell it in messages.
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Coerces a raw value into a finite number.
///
/// Accepts JSON numbers, numeric strings (surrounding whitespace ignored, the
/// empty string reads as `0`) and booleans (`0`/`1`). Everything else is an
/// `invalid_type` violation.
///
/// # Errors
///
/// Returns a violation when the value has no numeric reading.
pub fn number(value: &Value) -> Result<f64, Violation> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    };

    match parsed {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(Violation::new(
            IssueCode::InvalidType,
            "Expected number, received nan",
        )),
    }
}

/// Coerces a raw value into a strictly positive integer, optionally bounded.
///
/// # Errors
///
/// Returns `invalid_type` for non-integers, `too_small` for values `<= 0`, and
/// `too_big` above `max` (or above [`MAX_SAFE_INTEGER`]).
pub fn positive_int(value: &Value, max: Option<u64>) -> Result<u64, Violation> {
    let n = number(value)?;
    if n.fract() != 0.0 {
        return Err(Violation::new(
            IssueCode::InvalidType,
            "Expected integer, received float",
        ));
    }
    if n <= 0.0 {
        return Err(Violation::new(
            IssueCode::TooSmall,
            "Number must be greater than 0",
        ));
    }

    let limit = max.unwrap_or(MAX_SAFE_INTEGER).min(MAX_SAFE_INTEGER);
    #[allow(clippy::cast_precision_loss)]
    let upper = limit as f64;
    if n > upper {
        return Err(Violation::new(
            IssueCode::TooBig,
            format!("Number must be less than or equal to {limit}"),
        ));
    }

    // Integral, positive and at most 2^53 - 1, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let exact = n as u64;
    Ok(exact)
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Coerces a raw value into a UTC instant.
///
/// Strings may be RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` timestamp, or a
/// bare `YYYY-MM-DD` date (midnight); naive forms are read as UTC. JSON
/// numbers are epoch milliseconds. Instants outside years 0000 to 9999 are
/// rejected, since RFC 3339 output could not be read back.
///
/// # Errors
///
/// Returns an `invalid_date` violation for anything else.
pub fn date(value: &Value) -> Result<DateTime<Utc>, Violation> {
    let parsed = match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    parsed
        .filter(|dt| (0..=9999).contains(&dt.year()))
        .ok_or_else(|| Violation::new(IssueCode::InvalidDate, "Invalid date"))
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Accepts any JSON string. No coercion from other types.
///
/// # Errors
///
/// Returns `invalid_type` for non-strings.
pub fn string(value: &Value) -> Result<String, Violation> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(Violation::expected("string", other)),
    }
}

/// Accepts a JSON string containing at least one character.
///
/// # Errors
///
/// Returns `invalid_type` for non-strings and `too_small` for `""`.
pub fn non_empty_string(value: &Value) -> Result<String, Violation> {
    let s = string(value)?;
    if s.is_empty() {
        return Err(Violation::new(
            IssueCode::TooSmall,
            "String must contain at least 1 character(s)",
        ));
    }
    Ok(s)
}

/// Accepts a JSON string that parses as an absolute URL.
///
/// # Errors
///
/// Returns `invalid_type` for non-strings and `custom` ("Invalid URL") when
/// the string does not parse.
pub fn url(value: &Value) -> Result<String, Violation> {
    let s = string(value)?;
    match ::url::Url::parse(&s) {
        Ok(_) => Ok(s),
        Err(_) => Err(Violation::new(IssueCode::Custom, "Invalid URL")),
    }
}

/// Accepts one of a fixed set of string literals, mapping it to `T`.
///
/// # Errors
///
/// Returns `invalid_enum_value` listing the accepted literals.
pub fn one_of<T: Copy>(value: &Value, variants: &[(&str, T)]) -> Result<T, Violation> {
    if let Value::String(s) = value {
        if let Some((_, variant)) = variants.iter().find(|(literal, _)| *literal == s.as_str()) {
            return Ok(*variant);
        }
    }

    let expected = variants
        .iter()
        .map(|(literal, _)| format!("'{literal}'"))
        .collect::<Vec<_>>()
        .join(" | ");
    let received = match value {
        Value::String(s) => format!("'{s}'"),
        other => type_name(other).to_string(),
    };
    Err(Violation::new(
        IssueCode::InvalidEnumValue,
        format!("Invalid enum value. Expected {expected}, received {received}"),
    ))
}
