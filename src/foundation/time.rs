use crate::foundation::error::{RemixError, RemixResult};

/// Parse a duration string into seconds.
///
/// Accepts `"SS"`, `"MM:SS"` and `"H:MM:SS"` forms (`"330"`, `"5:30"`,
/// `"1:02:03"`). Fractional seconds are allowed in the last component.
pub fn parse_duration(input: &str) -> RemixResult<f64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(RemixError::invalid("duration string is empty"));
    }

    let parts: Vec<&str> = s.split(':').collect();
    let secs = match parts.as_slice() {
        [secs] => parse_component(secs, "seconds")?,
        [mins, secs] => {
            let m = parse_component(mins, "minutes")?;
            let sec = parse_component(secs, "seconds")?;
            m * 60.0 + sec
        }
        [hours, mins, secs] => {
            let h = parse_component(hours, "hours")?;
            let m = parse_component(mins, "minutes")?;
            let sec = parse_component(secs, "seconds")?;
            h * 3600.0 + m * 60.0 + sec
        }
        _ => {
            return Err(RemixError::invalid(format!(
                "duration '{s}' has too many ':' components (expected SS, MM:SS or H:MM:SS)"
            )));
        }
    };

    if !secs.is_finite() || secs < 0.0 {
        return Err(RemixError::invalid(format!(
            "duration '{s}' must be a finite, non-negative time"
        )));
    }
    Ok(secs)
}

fn parse_component(part: &str, what: &str) -> RemixResult<f64> {
    part.trim()
        .parse::<f64>()
        .map_err(|_| RemixError::invalid(format!("invalid {what} component '{part}' in duration")))
}

/// Format seconds as `H:MM:SS`, truncating sub-second precision.
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h}:{m:02}:{s:02}")
}

/// Format a `[start, end)` pair as `H:MM:SS-H:MM:SS`.
pub fn format_range(start: f64, end: f64) -> String {
    format!("{}-{}", format_duration(start), format_duration(end))
}
