//! Time text used by the panel inputs and feedback toasts.

use crate::error::TimeParseError;

/// Format seconds as `M:SS`, or `H:MM:SS` once past the hour.
pub fn format_time(total_seconds: f64) -> String {
    let s = if total_seconds.is_finite() {
        total_seconds.max(0.0).floor() as u64
    } else {
        0
    };
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let sec = s % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, sec)
    } else {
        format!("{}:{:02}", m, sec)
    }
}

/// Parse `H:MM:SS`, `M:SS` or a bare number of seconds.
///
/// Range checks are left to the caller; a negative component parses fine
/// and is rejected by the panel's acceptance rule.
pub fn parse_time_input(text: &str) -> Result<f64, TimeParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let parts = text
        .split(':')
        .map(|p| {
            let p = p.trim();
            p.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| TimeParseError::NotANumber(p.to_string()))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    match parts.as_slice() {
        [s] => Ok(*s),
        [m, s] => Ok(m * 60.0 + s),
        [h, m, s] => Ok(h * 3600.0 + m * 60.0 + s),
        _ => Err(TimeParseError::TooManyFields(text.to_string())),
    }
}
