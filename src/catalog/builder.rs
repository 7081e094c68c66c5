use crate::{
    catalog::source::{Segment, SegmentId, Source},
    foundation::core::MIN_SIGNIFICANT_SEC,
    foundation::error::{RemixError, RemixResult},
};

/// Slice one source's duration into fixed-length segments.
///
/// Emits `floor(total_duration / segment_length)` full-length segments, plus
/// one trailing remainder segment when the leftover exceeds
/// [`MIN_SIGNIFICANT_SEC`]. The remainder is never padded or rounded up.
///
/// Fails with `InvalidConfiguration` when `segment_length` is non-positive,
/// non-finite, or not smaller than the source's total duration. The
/// degenerate single-segment case (`segment_length` just under
/// `total_duration`) is allowed; it simply produces nothing to reorder.
pub fn build_catalog(source: &Source, segment_length: f64) -> RemixResult<Vec<Segment>> {
    if !segment_length.is_finite() || segment_length <= 0.0 {
        return Err(RemixError::invalid(format!(
            "segment_length must be a positive finite number of seconds, got {segment_length}"
        )));
    }
    if !source.total_duration.is_finite() || source.total_duration <= 0.0 {
        return Err(RemixError::invalid(format!(
            "source '{}' must have a positive finite total_duration, got {}",
            source.display_name, source.total_duration
        )));
    }
    if segment_length >= source.total_duration {
        return Err(RemixError::invalid(format!(
            "segment_length {segment_length} must be smaller than source '{}' duration {}",
            source.display_name, source.total_duration
        )));
    }

    let count = (source.total_duration / segment_length).floor() as u32;
    let mut segments = Vec::with_capacity(count as usize + 1);

    for i in 0..count {
        let start = f64::from(i) * segment_length;
        segments.push(make_segment(source, i + 1, start, start + segment_length));
    }

    let consumed = f64::from(count) * segment_length;
    let remainder = source.total_duration - consumed;
    if remainder > MIN_SIGNIFICANT_SEC {
        segments.push(make_segment(
            source,
            count + 1,
            consumed,
            source.total_duration,
        ));
    }

    Ok(segments)
}

/// Build one combined catalog over several sources, in registration order.
pub fn build_catalogs(sources: &[Source], segment_length: f64) -> RemixResult<Vec<Segment>> {
    let mut all = Vec::new();
    for source in sources {
        all.extend(build_catalog(source, segment_length)?);
    }
    Ok(all)
}

fn make_segment(source: &Source, index: u32, start: f64, end: f64) -> Segment {
    Segment {
        source_id: source.id,
        source_name: source.display_name.clone(),
        index,
        start,
        end,
        duration: end - start,
        global_id: SegmentId::new(source.id, index),
    }
}
