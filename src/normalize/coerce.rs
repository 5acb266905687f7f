//! Lenient conversion of loosely typed JSON values.
//!
//! Nothing here fails: a value that cannot be read as the target type is
//! returned as `None` and the caller decides what absence means.

use serde_json::Value;

/// Read a finite float from a number or a numeric string.
pub fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    if parsed.is_finite() {
        Some(parsed)
    } else {
        None
    }
}

/// Read a finite float that is not negative.
pub fn coerce_non_negative_f64(value: Option<&Value>) -> Option<f64> {
    coerce_f64(value).filter(|v| *v >= 0.0)
}

/// Read an integer. Integral floats (`2.0`, `"2.0"`) are accepted, fractional ones are not.
pub fn coerce_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

/// Read a non-negative count.
pub fn coerce_count(value: Option<&Value>) -> Option<u32> {
    coerce_i64(value).and_then(|v| u32::try_from(v).ok())
}

/// Read text. Numbers are rendered as text (postal codes sometimes arrive that way);
/// blank strings, booleans and containers are absent.
pub fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integral_f64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
