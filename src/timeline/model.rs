use crate::{
    catalog::source::Segment,
    foundation::core::{Canvas, TimeRange},
    foundation::error::{RemixError, RemixResult},
};

/// Role of a placement within its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PlacementKind {
    /// The slot's main, in-order content, one per schedule entry.
    Primary,
    /// An additional randomly geometrized layer atop the primary's window.
    Secondary,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// One positioned, sized, timed instance of a segment in the composed output.
pub struct Placement {
    /// Primary or secondary role.
    pub kind: PlacementKind,
    /// The segment whose content this placement shows.
    pub segment: Segment,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Left edge in pixels from the canvas left.
    pub x: u32,
    /// Top edge in pixels from the canvas top.
    pub y: u32,
    /// Start of playback within the segment's source, seconds. Equal to the
    /// segment's own start for primaries; secondaries may begin mid-segment.
    pub source_start: f64,
    /// Start on the output timeline, seconds.
    pub timeline_start: f64,
    /// Playback duration, seconds.
    pub duration: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

impl Placement {
    /// The placement's window on the output timeline.
    pub fn window(&self) -> RemixResult<TimeRange> {
        TimeRange::new(self.timeline_start, self.timeline_start + self.duration)
    }

    fn in_bounds(&self, canvas: Canvas) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(canvas.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(canvas.height)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// One schedule entry expanded into placements: exactly one primary plus
/// zero-or-more secondary overlays inside the primary's time window.
pub struct Slot {
    pub primary: Placement,
    pub overlays: Vec<Placement>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// The complete collection of placements a rendering backend executes.
///
/// Built once per render request; canvas dimensions are fixed for the whole
/// timeline.
pub struct Timeline {
    /// Output frame dimensions.
    pub canvas: Canvas,
    /// Slots in playback order, one per schedule entry.
    pub slots: Vec<Slot>,
    /// Total output duration, seconds (sum of primary durations).
    pub total_duration: f64,
}

impl Timeline {
    /// All placements in deterministic emission order: slot by slot, the
    /// primary first, then its overlays.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.slots
            .iter()
            .flat_map(|slot| std::iter::once(&slot.primary).chain(slot.overlays.iter()))
    }

    /// Validate geometric and temporal invariants of the whole timeline.
    pub fn validate(&self) -> RemixResult<()> {
        if self.canvas.is_degenerate() {
            return Err(RemixError::NoCanvasReference);
        }
        if self.slots.is_empty() {
            return Err(RemixError::EmptyTimeline);
        }

        for (i, slot) in self.slots.iter().enumerate() {
            if slot.primary.kind != PlacementKind::Primary {
                return Err(RemixError::invalid(format!(
                    "slot {i} primary placement has kind {:?}",
                    slot.primary.kind
                )));
            }
            validate_placement(&slot.primary, self.canvas, i)?;
            let slot_window = slot.primary.window()?;

            for overlay in &slot.overlays {
                if overlay.kind != PlacementKind::Secondary {
                    return Err(RemixError::invalid(format!(
                        "slot {i} overlay has kind {:?}",
                        overlay.kind
                    )));
                }
                validate_placement(overlay, self.canvas, i)?;

                if overlay.segment.global_id == slot.primary.segment.global_id {
                    return Err(RemixError::invalid(format!(
                        "slot {i} overlay references the slot's own segment {}",
                        overlay.segment.global_id
                    )));
                }
                let bound = slot.primary.duration.min(overlay.segment.duration);
                if overlay.duration > bound + 1e-9 {
                    return Err(RemixError::invalid(format!(
                        "slot {i} overlay duration {} exceeds bound {bound}",
                        overlay.duration
                    )));
                }
                if !slot_window.encloses(overlay.window()?) {
                    return Err(RemixError::invalid(format!(
                        "slot {i} overlay window escapes the slot window"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn validate_placement(p: &Placement, canvas: Canvas, slot: usize) -> RemixResult<()> {
    if p.width == 0 || p.height == 0 {
        return Err(RemixError::invalid(format!(
            "slot {slot} placement has a zero dimension ({}x{})",
            p.width, p.height
        )));
    }
    if !p.in_bounds(canvas) {
        return Err(RemixError::invalid(format!(
            "slot {slot} placement {}x{}+{}+{} escapes the {}x{} canvas",
            p.width, p.height, p.x, p.y, canvas.width, canvas.height
        )));
    }
    if !p.duration.is_finite() || p.duration <= 0.0 {
        return Err(RemixError::invalid(format!(
            "slot {slot} placement duration must be positive, got {}",
            p.duration
        )));
    }
    if !(0.0..=1.0).contains(&p.opacity) {
        return Err(RemixError::invalid(format!(
            "slot {slot} placement opacity {} outside [0, 1]",
            p.opacity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::source::{SegmentId, SourceId};

    fn seg(id: u32, index: u32) -> Segment {
        Segment {
            source_id: SourceId(id),
            source_name: format!("s{id}"),
            index,
            start: 0.0,
            end: 5.0,
            duration: 5.0,
            global_id: SegmentId::new(SourceId(id), index),
        }
    }

    fn full_canvas_primary() -> Placement {
        Placement {
            kind: PlacementKind::Primary,
            segment: seg(0, 1),
            width: 1280,
            height: 720,
            x: 0,
            y: 0,
            source_start: 0.0,
            timeline_start: 0.0,
            duration: 5.0,
            opacity: 1.0,
        }
    }

    #[test]
    fn valid_single_slot_passes() {
        let tl = Timeline {
            canvas: Canvas::new(1280, 720).unwrap(),
            slots: vec![Slot {
                primary: full_canvas_primary(),
                overlays: vec![],
            }],
            total_duration: 5.0,
        };
        tl.validate().unwrap();
    }

    #[test]
    fn out_of_bounds_placement_is_rejected() {
        let mut primary = full_canvas_primary();
        primary.x = 1;
        let tl = Timeline {
            canvas: Canvas::new(1280, 720).unwrap(),
            slots: vec![Slot {
                primary,
                overlays: vec![],
            }],
            total_duration: 5.0,
        };
        assert!(tl.validate().is_err());
    }

    #[test]
    fn self_referencing_overlay_is_rejected() {
        let overlay = Placement {
            kind: PlacementKind::Secondary,
            segment: seg(0, 1), // same as primary
            width: 320,
            height: 240,
            x: 10,
            y: 10,
            source_start: 0.0,
            timeline_start: 0.5,
            duration: 2.0,
            opacity: 0.65,
        };
        let tl = Timeline {
            canvas: Canvas::new(1280, 720).unwrap(),
            slots: vec![Slot {
                primary: full_canvas_primary(),
                overlays: vec![overlay],
            }],
            total_duration: 5.0,
        };
        assert!(tl.validate().is_err());
    }

    #[test]
    fn empty_timeline_is_rejected() {
        let tl = Timeline {
            canvas: Canvas::new(1280, 720).unwrap(),
            slots: vec![],
            total_duration: 0.0,
        };
        assert!(matches!(tl.validate(), Err(RemixError::EmptyTimeline)));
    }
}
