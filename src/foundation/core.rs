use crate::foundation::error::{RemixError, RemixResult};

/// Smallest time delta (seconds) treated as significant when partitioning.
///
/// A trailing remainder shorter than this is dropped rather than emitted as a
/// degenerate segment. Half of the 0.1 s minimum addressable unit.
pub const MIN_SIGNIFICANT_SEC: f64 = 0.05;

/// Minimum duration (seconds) for a secondary overlay to be worth placing.
pub const MIN_OVERLAY_SEC: f64 = 0.25;

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> RemixResult<Self> {
        if width == 0 || height == 0 {
            return Err(RemixError::NoCanvasReference);
        }
        Ok(Self { width, height })
    }

    pub fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Half-open time interval `[start, end)` in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64, // exclusive
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> RemixResult<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start > end {
            return Err(RemixError::invalid(format!(
                "time range must satisfy 0 <= start <= end, got [{start}, {end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(self) -> f64 {
        self.end - self.start
    }

    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Whether `inner` lies fully within `self`, with a small tolerance for
    /// accumulated floating-point error.
    pub fn encloses(self, inner: TimeRange) -> bool {
        inner.start >= self.start - 1e-9 && inner.end <= self.end + 1e-9
    }
}
