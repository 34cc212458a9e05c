//! Text rendering of comparison values.
//!
//! Subject/reference values render as fixed six-decimal text or an empty
//! string. DIFF and INDEX render missing as [`MISSING_SENTINEL`] instead,
//! because downstream classification treats a missing DIFF as meaningful.

use crate::model::Cell;

pub const MISSING_SENTINEL: &str = "NaN";

/// Largest magnitude at which an integral float is printed without a fraction.
const INTEGRAL_DISPLAY_LIMIT: f64 = 1e15;

pub fn fixed6(v: f64) -> String {
    format!("{v:.6}")
}

pub fn format_value(v: Option<f64>) -> String {
    v.map(fixed6).unwrap_or_default()
}

pub fn format_diff(v: Option<f64>) -> String {
    match v {
        Some(d) if d.is_finite() => fixed6(d),
        _ => MISSING_SENTINEL.to_string(),
    }
}

pub fn format_index(i: Option<usize>) -> String {
    match i {
        Some(i) => i.to_string(),
        None => MISSING_SENTINEL.to_string(),
    }
}

/// Parse a rendered DIFF. The sentinel, empty text and anything non-numeric
/// or non-finite are all `None`.
pub fn parse_diff(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == MISSING_SENTINEL {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn format_key(cell: &Cell) -> String {
    match cell {
        Cell::Missing => String::new(),
        Cell::Text(s) => s.clone(),
        Cell::Number(n) => format_number(*n),
    }
}

/// Integral values print without a fractional part (`1234`, not `1234.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < INTEGRAL_DISPLAY_LIMIT {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
