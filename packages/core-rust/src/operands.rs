//! Validation of loosely-typed transport input into calculator operands.
//!
//! The transport layer hands over raw JSON values and query strings; these
//! helpers decide, in one place, what counts as a proper integer sequence,
//! a valid pop count or a known history filter. Validation never touches
//! calculator state, so a rejected input leaves the stack untouched.

use serde_json::Value;

use crate::error::{CalcError, CalcResult};
use crate::history::Origin;

/// How an absent request value is named in error messages.
pub const MISSING_VALUE: &str = "undefined";

const MISSING_ARGUMENTS: &str = "Invalid or missing 'arguments' array";
const NON_INTEGER_ARGUMENTS: &str = "All arguments must be integers";

/// Converts a JSON value into an ordered list of integer operands.
///
/// Integral floating-point numbers (e.g. `2.0`) are accepted when they are
/// exactly representable as an `i64`.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] if the value is missing or not an
/// array, or if any element is not an integer.
pub fn parse_operands(value: Option<&Value>) -> CalcResult<Vec<i64>> {
    let Some(Value::Array(items)) = value else {
        return Err(CalcError::invalid_input(MISSING_ARGUMENTS));
    };

    items
        .iter()
        .map(|item| as_integer(item).ok_or_else(|| CalcError::invalid_input(NON_INTEGER_ARGUMENTS)))
        .collect()
}

fn as_integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(n) = number.as_i64() {
        return Some(n);
    }
    let f = number.as_f64()?;
    // 2^63 is exactly representable; anything at or above it is out of range.
    #[allow(clippy::cast_precision_loss)]
    let upper = i64::MAX as f64;
    if f.fract() == 0.0 && f >= -upper && f < upper {
        #[allow(clippy::cast_possible_truncation)]
        Some(f as i64)
    } else {
        None
    }
}

/// Parses a pop count taken from a query string.
///
/// `available` is the current stack size, used only for the error message.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] if the count is missing, not a
/// whole number, or negative, and [`CalcError::Underflow`] for a whole
/// number too large to ever fit on the stack.
pub fn parse_count(raw: Option<&str>, available: usize) -> CalcResult<usize> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if let Ok(count) = raw.parse::<usize>() {
        return Ok(count);
    }
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CalcError::Underflow {
            requested: digits.to_string(),
            available,
        });
    }
    let shown = if raw.is_empty() { MISSING_VALUE } else { raw };
    Err(CalcError::invalid_input(format!(
        "Error: cannot remove {shown} from the stack. It has only {available} arguments"
    )))
}

/// Parses an optional history filter (`STACK` or `INDEPENDENT`).
///
/// An absent or empty filter means "all entries".
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] for any other value.
pub fn parse_origin(raw: Option<&str>) -> CalcResult<Option<Origin>> {
    match raw {
        None | Some("") => Ok(None),
        Some(flavor) => flavor
            .parse::<Origin>()
            .map(Some)
            .map_err(|_| CalcError::invalid_input(format!("Error: unknown flavor: {flavor}"))),
    }
}
