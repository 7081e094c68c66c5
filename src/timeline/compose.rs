use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use rand::{Rng, rngs::StdRng, seq::SliceRandom};

use crate::{
    catalog::source::{Segment, Source, SourceId},
    foundation::core::{Canvas, MIN_OVERLAY_SEC},
    foundation::error::{RemixError, RemixResult},
    schedule::scheduler::Schedule,
    timeline::model::{Placement, PlacementKind, Slot, Timeline},
};

/// Primary placements cover 50-90% of the canvas per dimension.
const PRIMARY_SIZE_RANGE: RangeInclusive<f64> = 0.5..=0.9;
/// Absolute pixel floor for a primary placement dimension.
const PRIMARY_MIN_PX: u32 = 160;
/// Primaries are near-opaque.
const PRIMARY_OPACITY: RangeInclusive<f64> = 0.8..=1.0;

/// Overlay duration as a fraction of its slot's duration.
const OVERLAY_SLOT_FRACTION: RangeInclusive<f64> = 0.4..=0.9;
/// Overlays are clearly transparent.
const OVERLAY_OPACITY: RangeInclusive<f64> = 0.6..=0.7;
/// Absolute pixel floor for an overlay dimension.
const OVERLAY_MIN_PX: u32 = 80;
/// Attempts to draw an overlay segment distinct from the slot's own.
const OVERLAY_REDRAWS: u32 = 8;

/// Aspect-ratio / size-range category for a secondary overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ShapeProfile {
    SmallSquare,
    MediumSquare,
    Wide,
    Tall,
    Panoramic,
}

impl ShapeProfile {
    /// Width / height ratio of the category.
    fn aspect(self) -> f64 {
        match self {
            ShapeProfile::SmallSquare | ShapeProfile::MediumSquare => 1.0,
            ShapeProfile::Wide => 16.0 / 9.0,
            ShapeProfile::Tall => 9.0 / 16.0,
            ShapeProfile::Panoramic => 3.0,
        }
    }

    /// Width as a fraction of the canvas width.
    fn size_range(self) -> RangeInclusive<f64> {
        match self {
            ShapeProfile::SmallSquare => 0.10..=0.20,
            ShapeProfile::MediumSquare => 0.20..=0.35,
            ShapeProfile::Wide => 0.25..=0.45,
            ShapeProfile::Tall => 0.12..=0.22,
            ShapeProfile::Panoramic => 0.40..=0.60,
        }
    }

    /// Default relative selection probabilities.
    pub fn default_weights() -> Vec<(ShapeProfile, f64)> {
        vec![
            (ShapeProfile::SmallSquare, 3.0),
            (ShapeProfile::MediumSquare, 2.0),
            (ShapeProfile::Wide, 2.0),
            (ShapeProfile::Tall, 1.5),
            (ShapeProfile::Panoramic, 1.0),
        ]
    }
}

/// Knobs for expanding a schedule into a layered timeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ComposeOptions {
    /// `false` selects the simple full-canvas concatenation path.
    pub overlay_enabled: bool,
    /// Secondary overlays drawn per slot (sampled per slot).
    pub overlays_per_slot: RangeInclusive<u32>,
    /// Weighted shape-profile enumeration for overlays.
    pub shape_weights: Vec<(ShapeProfile, f64)>,
    /// Stop emitting slots once the next primary would exceed this many
    /// seconds of output. At least one slot is always emitted.
    pub output_duration_cap: Option<f64>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            overlay_enabled: false,
            overlays_per_slot: 1..=3,
            shape_weights: ShapeProfile::default_weights(),
            output_duration_cap: None,
        }
    }
}

impl ComposeOptions {
    fn validate(&self) -> RemixResult<()> {
        if self.overlays_per_slot.start() > self.overlays_per_slot.end() {
            return Err(RemixError::invalid(
                "overlays_per_slot range must not be empty",
            ));
        }
        if self.overlay_enabled {
            if self.shape_weights.is_empty() {
                return Err(RemixError::invalid(
                    "shape_weights must not be empty when overlays are enabled",
                ));
            }
            for (profile, w) in &self.shape_weights {
                if !w.is_finite() || *w <= 0.0 {
                    return Err(RemixError::invalid(format!(
                        "shape weight for {profile:?} must be finite and > 0, got {w}"
                    )));
                }
            }
        }
        if let Some(cap) = self.output_duration_cap
            && (!cap.is_finite() || cap <= 0.0)
        {
            return Err(RemixError::invalid(format!(
                "output_duration_cap must be finite and > 0, got {cap}"
            )));
        }
        Ok(())
    }
}

/// Why an overlay candidate was dropped. Never surfaced to callers; logged
/// and discarded, the slot simply gets fewer overlays.
#[derive(Clone, Copy, Debug)]
enum OverlayRejection {
    /// No catalog segment other than the slot's own exists or was drawn.
    NoAlternativeSegment,
    /// Computed duration fell below the minimum-significance threshold.
    TooShort { duration: f64 },
    /// The weighted shape draw failed (empty or degenerate weight table).
    ShapeDrawFailed,
}

/// Expand a schedule into a layered placement timeline.
///
/// With overlays disabled, or fewer than two schedule entries, every entry
/// becomes one full-canvas primary placement at sequential starts (the
/// simple-concatenation path, always available as a fallback). Otherwise each
/// slot gets a randomly sized and positioned near-opaque primary plus a small
/// number of transparent secondary overlays sampled from the catalog.
///
/// Pure in its inputs plus the supplied random stream; an unexpected failure
/// on the collage path falls back to simple concatenation rather than
/// aborting.
#[tracing::instrument(skip_all, fields(entries = schedule.len(), overlay = options.overlay_enabled))]
pub fn compose(
    schedule: &Schedule,
    catalog: &[Segment],
    sources: &[Source],
    canvas: Canvas,
    options: &ComposeOptions,
    rng: &mut StdRng,
) -> RemixResult<Timeline> {
    if canvas.is_degenerate() {
        return Err(RemixError::NoCanvasReference);
    }
    if schedule.is_empty() {
        return Err(RemixError::EmptySchedule);
    }
    options.validate()?;

    if !options.overlay_enabled || schedule.len() < 2 {
        return concat_timeline(schedule, canvas, options.output_duration_cap);
    }

    match collage_timeline(schedule, catalog, sources, canvas, options, rng) {
        Ok(timeline) => Ok(timeline),
        Err(err) => {
            tracing::warn!(%err, "collage composition failed, falling back to concatenation");
            concat_timeline(schedule, canvas, options.output_duration_cap)
        }
    }
}

/// One full-canvas primary per entry, sequential, fully opaque.
fn concat_timeline(
    schedule: &Schedule,
    canvas: Canvas,
    cap: Option<f64>,
) -> RemixResult<Timeline> {
    let mut slots = Vec::with_capacity(schedule.len());
    let mut current = 0.0;

    for seg in &schedule.entries {
        if hits_cap(cap, current, seg.duration, slots.len()) {
            break;
        }
        slots.push(Slot {
            primary: Placement {
                kind: PlacementKind::Primary,
                segment: seg.clone(),
                width: canvas.width,
                height: canvas.height,
                x: 0,
                y: 0,
                source_start: seg.start,
                timeline_start: current,
                duration: seg.duration,
                opacity: 1.0,
            },
            overlays: vec![],
        });
        current += seg.duration;
    }

    finish_timeline(canvas, slots, current)
}

fn collage_timeline(
    schedule: &Schedule,
    catalog: &[Segment],
    sources: &[Source],
    canvas: Canvas,
    options: &ComposeOptions,
    rng: &mut StdRng,
) -> RemixResult<Timeline> {
    let source_durations: BTreeMap<SourceId, f64> = sources
        .iter()
        .map(|s| (s.id, s.total_duration))
        .collect();

    let mut slots = Vec::with_capacity(schedule.len());
    let mut current = 0.0;

    for (slot_index, seg) in schedule.entries.iter().enumerate() {
        if hits_cap(options.output_duration_cap, current, seg.duration, slots.len()) {
            break;
        }

        let primary = primary_placement(seg, canvas, current, rng);
        let overlay_count = rng.gen_range(options.overlays_per_slot.clone());
        let mut overlays = Vec::with_capacity(overlay_count as usize);

        for _ in 0..overlay_count {
            match overlay_placement(&primary, catalog, &source_durations, canvas, options, rng) {
                Ok(overlay) => overlays.push(overlay),
                Err(rejection) => {
                    tracing::debug!(slot = slot_index, ?rejection, "overlay dropped");
                }
            }
        }

        current += primary.duration;
        slots.push(Slot { primary, overlays });
    }

    finish_timeline(canvas, slots, current)
}

fn finish_timeline(canvas: Canvas, slots: Vec<Slot>, total: f64) -> RemixResult<Timeline> {
    if slots.is_empty() {
        return Err(RemixError::EmptyTimeline);
    }
    Ok(Timeline {
        canvas,
        slots,
        total_duration: total,
    })
}

fn hits_cap(cap: Option<f64>, current: f64, next: f64, emitted: usize) -> bool {
    match cap {
        // The first slot is always emitted, even when it alone exceeds the cap.
        Some(cap) => emitted > 0 && current + next > cap + 1e-9,
        None => false,
    }
}

/// Randomly sized, in-bounds, near-opaque primary for one slot.
fn primary_placement(seg: &Segment, canvas: Canvas, start: f64, rng: &mut StdRng) -> Placement {
    let width = sample_dimension(canvas.width, PRIMARY_SIZE_RANGE, PRIMARY_MIN_PX, rng);
    let height = sample_dimension(canvas.height, PRIMARY_SIZE_RANGE, PRIMARY_MIN_PX, rng);

    Placement {
        kind: PlacementKind::Primary,
        segment: seg.clone(),
        width,
        height,
        x: rng.gen_range(0..=canvas.width - width),
        y: rng.gen_range(0..=canvas.height - height),
        source_start: seg.start,
        timeline_start: start,
        duration: seg.duration,
        opacity: rng.gen_range(PRIMARY_OPACITY),
    }
}

/// Evaluate one overlay candidate against all placement constraints, yielding
/// either a valid placement or the reason it was rejected.
fn overlay_placement(
    primary: &Placement,
    catalog: &[Segment],
    source_durations: &BTreeMap<SourceId, f64>,
    canvas: Canvas,
    options: &ComposeOptions,
    rng: &mut StdRng,
) -> Result<Placement, OverlayRejection> {
    let seg = draw_other_segment(catalog, &primary.segment, rng)
        .ok_or(OverlayRejection::NoAlternativeSegment)?;

    // Duration: a fraction of the slot, bounded by the segment itself and by
    // what is left of its source from the segment's start.
    let source_total = source_durations
        .get(&seg.source_id)
        .copied()
        .unwrap_or(seg.end);
    let duration = (rng.gen_range(OVERLAY_SLOT_FRACTION) * primary.duration)
        .min(seg.duration)
        .min(source_total - seg.start);
    if duration < MIN_OVERLAY_SEC {
        return Err(OverlayRejection::TooShort { duration });
    }

    // validate() guarantees a non-empty, all-positive weight table, so the
    // draw only fails on a degenerate table slipped past the caller.
    let profile = options
        .shape_weights
        .choose_weighted(rng, |(_, w)| *w)
        .map(|(p, _)| *p)
        .map_err(|_| OverlayRejection::ShapeDrawFailed)?;

    let width_frac = rng.gen_range(profile.size_range());
    let width_px = f64::from(canvas.width) * width_frac;
    let height_px = width_px / profile.aspect();

    let floor = OVERLAY_MIN_PX.min(canvas.width).min(canvas.height);
    let width = (width_px.round() as u32).clamp(floor, canvas.width);
    let height = (height_px.round() as u32).clamp(floor, canvas.height);

    // Start offset within the source segment, delay within the slot; both
    // keep the overlay's window inside its bounds.
    let source_start = seg.start + rng.gen_range(0.0..=(seg.duration - duration).max(0.0));
    let delay = rng.gen_range(0.0..=(primary.duration - duration).max(0.0));

    Ok(Placement {
        kind: PlacementKind::Secondary,
        segment: seg.clone(),
        width,
        height,
        x: rng.gen_range(0..=canvas.width - width),
        y: rng.gen_range(0..=canvas.height - height),
        source_start,
        timeline_start: primary.timeline_start + delay,
        duration,
        opacity: rng.gen_range(OVERLAY_OPACITY),
    })
}

/// Draw a catalog segment distinct from `own`, retrying on collision.
fn draw_other_segment<'a>(
    catalog: &'a [Segment],
    own: &Segment,
    rng: &mut StdRng,
) -> Option<&'a Segment> {
    if catalog.len() < 2 {
        return None;
    }
    for _ in 0..OVERLAY_REDRAWS {
        let candidate = &catalog[rng.gen_range(0..catalog.len())];
        if candidate.global_id != own.global_id {
            return Some(candidate);
        }
    }
    None
}

fn sample_dimension(
    canvas_px: u32,
    range: RangeInclusive<f64>,
    min_px: u32,
    rng: &mut StdRng,
) -> u32 {
    let sampled = (f64::from(canvas_px) * rng.gen_range(range)).round() as u32;
    sampled.clamp(min_px.min(canvas_px), canvas_px)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::builder::build_catalogs,
        schedule::scheduler::{ScheduleOptions, rng_from_seed, schedule},
    };

    fn setup(n_sources: u32, total: f64, seg_len: f64) -> (Vec<Source>, Vec<Segment>, Schedule) {
        let sources: Vec<Source> = (0..n_sources)
            .map(|i| Source::new(SourceId(i), format!("s{i}"), total))
            .collect();
        let catalog = build_catalogs(&sources, seg_len).unwrap();
        let mut rng = rng_from_seed(Some(11));
        let sched = schedule(&catalog, &ScheduleOptions::default(), &mut rng).unwrap();
        (sources, catalog, sched)
    }

    fn canvas() -> Canvas {
        Canvas::new(1280, 720).unwrap()
    }

    #[test]
    fn concat_path_emits_full_canvas_primaries_only() {
        let (sources, catalog, sched) = setup(2, 8.0, 2.0);
        let mut rng = rng_from_seed(Some(5));
        let tl = compose(
            &sched,
            &catalog,
            &sources,
            canvas(),
            &ComposeOptions::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(tl.slots.len(), 8);
        for slot in &tl.slots {
            assert!(slot.overlays.is_empty());
            assert_eq!(slot.primary.width, 1280);
            assert_eq!(slot.primary.height, 720);
            assert_eq!((slot.primary.x, slot.primary.y), (0, 0));
        }
        tl.validate().unwrap();
    }

    #[test]
    fn single_entry_schedule_takes_the_concat_path() {
        let source = Source::new(SourceId(0), "s0", 10.0);
        let catalog = crate::catalog::builder::build_catalog(&source, 9.98).unwrap();
        assert_eq!(catalog.len(), 1);
        let sched = Schedule {
            entries: catalog.clone(),
        };

        let opts = ComposeOptions {
            overlay_enabled: true,
            ..ComposeOptions::default()
        };
        let mut rng = rng_from_seed(Some(5));
        let tl = compose(&sched, &catalog, &[source], canvas(), &opts, &mut rng).unwrap();
        assert_eq!(tl.slots.len(), 1);
        assert!(tl.slots[0].overlays.is_empty());
        assert_eq!(tl.slots[0].primary.width, 1280);
    }

    #[test]
    fn collage_timeline_validates_and_bounds_overlays() {
        let (sources, catalog, sched) = setup(2, 30.0, 5.0);
        let opts = ComposeOptions {
            overlay_enabled: true,
            overlays_per_slot: 1..=4,
            ..ComposeOptions::default()
        };
        let mut rng = rng_from_seed(Some(99));
        let tl = compose(&sched, &catalog, &sources, canvas(), &opts, &mut rng).unwrap();

        tl.validate().unwrap();
        let overlay_total: usize = tl.slots.iter().map(|s| s.overlays.len()).sum();
        assert!(overlay_total > 0, "expected at least one overlay");

        for slot in &tl.slots {
            for overlay in &slot.overlays {
                assert_ne!(overlay.segment.global_id, slot.primary.segment.global_id);
                assert!(overlay.duration <= slot.primary.duration + 1e-9);
                assert!(overlay.duration <= overlay.segment.duration + 1e-9);
                assert!((0.6..=0.7).contains(&overlay.opacity));
            }
            assert!((0.8..=1.0).contains(&slot.primary.opacity));
        }
    }

    #[test]
    fn collage_is_deterministic_for_a_fixed_rng() {
        let (sources, catalog, sched) = setup(2, 30.0, 5.0);
        let opts = ComposeOptions {
            overlay_enabled: true,
            ..ComposeOptions::default()
        };
        let mut a = rng_from_seed(Some(4));
        let mut b = rng_from_seed(Some(4));
        let ta = compose(&sched, &catalog, &sources, canvas(), &opts, &mut a).unwrap();
        let tb = compose(&sched, &catalog, &sources, canvas(), &opts, &mut b).unwrap();
        assert_eq!(
            serde_json::to_string(&ta).unwrap(),
            serde_json::to_string(&tb).unwrap()
        );
    }

    #[test]
    fn duration_cap_stops_slot_emission() {
        let (sources, catalog, sched) = setup(1, 20.0, 2.0);
        let opts = ComposeOptions {
            output_duration_cap: Some(7.0),
            ..ComposeOptions::default()
        };
        let mut rng = rng_from_seed(Some(2));
        let tl = compose(&sched, &catalog, &sources, canvas(), &opts, &mut rng).unwrap();
        assert_eq!(tl.slots.len(), 3); // 3 x 2 s fit under 7 s, a 4th would not
        assert!(tl.total_duration <= 7.0);
    }

    #[test]
    fn degenerate_canvas_is_no_canvas_reference() {
        let (sources, catalog, sched) = setup(1, 20.0, 2.0);
        let bad = Canvas {
            width: 0,
            height: 720,
        };
        let mut rng = rng_from_seed(Some(2));
        let err = compose(
            &sched,
            &catalog,
            &sources,
            bad,
            &ComposeOptions::default(),
            &mut rng,
        );
        assert!(matches!(err, Err(RemixError::NoCanvasReference)));
    }

    #[test]
    fn empty_schedule_is_rejected() {
        let (sources, catalog, _) = setup(1, 20.0, 2.0);
        let empty = Schedule { entries: vec![] };
        let mut rng = rng_from_seed(Some(2));
        let err = compose(
            &empty,
            &catalog,
            &sources,
            canvas(),
            &ComposeOptions::default(),
            &mut rng,
        );
        assert!(matches!(err, Err(RemixError::EmptySchedule)));
    }
}
