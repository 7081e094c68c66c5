use std::fmt;

/// Stable identifier of a registered source, assigned at registration.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a segment, unique across all sources.
///
/// Derived as `"{source_id}:{segment_index}"`; two catalogs built from the
/// same sources with the same segment length produce identical ids.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SegmentId(pub String);

impl SegmentId {
    pub fn new(source: SourceId, index: u32) -> Self {
        Self(format!("{source}:{index}"))
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One registered input media item with a known total duration.
///
/// Immutable once registered; the catalog builder is the only consumer of
/// `total_duration`.
pub struct Source {
    /// Identifier, unique within a request.
    pub id: SourceId,
    /// Human-readable name used in reports.
    pub display_name: String,
    /// Total duration in seconds.
    pub total_duration: f64,
}

impl Source {
    pub fn new(id: SourceId, display_name: impl Into<String>, total_duration: f64) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            total_duration,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// A contiguous time slice of one source, the atomic unit of reordering.
///
/// Segments of a source are contiguous, non-overlapping and ordered by
/// `start`; their union covers `[0, total_duration)` except for an
/// insignificant dropped remainder. Read-only after construction.
pub struct Segment {
    /// Owning source.
    pub source_id: SourceId,
    /// Owning source's display name, denormalized for reporting.
    pub source_name: String,
    /// 1-based position within the owning source.
    pub index: u32,
    /// Start time within the source, seconds.
    pub start: f64,
    /// End time within the source, seconds (exclusive).
    pub end: f64,
    /// `end - start`, seconds.
    pub duration: f64,
    /// Identifier unique across all sources.
    pub global_id: SegmentId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_ids_are_unique_across_sources() {
        let a = SegmentId::new(SourceId(0), 3);
        let b = SegmentId::new(SourceId(1), 3);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "0:3");
    }
}
