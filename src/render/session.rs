use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{
    catalog::builder::build_catalogs,
    catalog::source::{Source, SourceId},
    foundation::core::Canvas,
    foundation::error::{RemixError, RemixResult},
    render::backend::{MediaBackend, WriteParams},
    schedule::report::report,
    schedule::scheduler::{Schedule, ScheduleOptions, rng_from_seed, schedule},
    timeline::compose::{ComposeOptions, compose},
    timeline::model::{Placement, Timeline},
};

/// One full render request, validated eagerly before any backend work.
#[derive(Clone, Debug)]
pub struct RemixRequest {
    /// Source media paths, in registration order. The first source's
    /// intrinsic size fixes the output canvas.
    pub inputs: Vec<PathBuf>,
    /// Segment length in seconds, applied to every source.
    pub segment_length: f64,
    /// Reproducibility seed; `None` uses ambient entropy.
    pub seed: Option<u64>,
    /// Per-source mix weights, keyed by registration index.
    pub weights: Option<BTreeMap<SourceId, f64>>,
    /// Compose a layered collage instead of a plain concatenation.
    pub overlay_enabled: bool,
    /// Target output frame rate.
    pub target_fps: Option<u32>,
    /// Cap on output duration, seconds.
    pub output_duration_cap: Option<f64>,
    /// Encoded output path.
    pub out_path: PathBuf,
}

impl RemixRequest {
    fn validate(&self) -> RemixResult<()> {
        if self.inputs.is_empty() {
            return Err(RemixError::NoCanvasReference);
        }
        if !self.segment_length.is_finite() || self.segment_length <= 0.0 {
            return Err(RemixError::invalid(format!(
                "segment_length must be finite and > 0, got {}",
                self.segment_length
            )));
        }
        if let Some(fps) = self.target_fps
            && fps == 0
        {
            return Err(RemixError::invalid("target_fps must be > 0"));
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

/// What a completed render session hands back to the caller.
///
/// The timeline itself stays internal; it only reaches the caller implicitly
/// through the rendered output file.
#[derive(Clone, Debug)]
pub struct RenderOutcome {
    /// The permuted segment ordering that was rendered.
    pub schedule: Schedule,
    /// The reporter's manifest for the schedule, for display or export.
    pub report: String,
}

/// Run the full pipeline against a backend: open sources, build the catalog,
/// schedule, compose, drive the backend slot by slot, encode, close.
///
/// Backend failures on the collage path trigger exactly one fallback to the
/// simple-concatenation path; if that also fails the error surfaces with the
/// underlying cause. Every opened handle is closed on every exit path;
/// close failures are logged and never override the primary result.
#[tracing::instrument(skip(backend, request), fields(inputs = request.inputs.len()))]
pub fn render<B: MediaBackend>(
    backend: &mut B,
    request: &RemixRequest,
) -> RemixResult<RenderOutcome> {
    request.validate()?;

    let mut handles: BTreeMap<SourceId, B::Handle> = BTreeMap::new();
    let outcome = render_with_handles(backend, request, &mut handles);

    // Handles are released whether the session succeeded or not.
    for (id, handle) in handles {
        if let Err(err) = backend.close(handle) {
            let err = RemixError::cleanup(format!("closing source {id}: {err}"));
            tracing::warn!(%err, "handle close failed");
        }
    }

    outcome
}

fn render_with_handles<B: MediaBackend>(
    backend: &mut B,
    request: &RemixRequest,
    handles: &mut BTreeMap<SourceId, B::Handle>,
) -> RemixResult<RenderOutcome> {
    let mut sources = Vec::with_capacity(request.inputs.len());
    let mut canvas: Option<Canvas> = None;

    for (i, path) in request.inputs.iter().enumerate() {
        let id = SourceId(i as u32);
        let handle = backend.open(path).map_err(|err| {
            RemixError::source_unavailable(format!("'{}': {err}", path.display()))
        })?;
        let display_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        sources.push(Source::new(id, display_name, backend.duration_of(&handle)));
        canvas.get_or_insert_with(|| backend.canvas_of(&handle));
        handles.insert(id, handle);
    }
    let canvas = canvas.ok_or(RemixError::NoCanvasReference)?;

    let catalog = build_catalogs(&sources, request.segment_length)?;
    let mut rng = rng_from_seed(request.seed);
    let sched = schedule(
        &catalog,
        &ScheduleOptions {
            weights: request.weights.clone(),
        },
        &mut rng,
    )?;

    let compose_options = ComposeOptions {
        overlay_enabled: request.overlay_enabled,
        output_duration_cap: request.output_duration_cap,
        ..ComposeOptions::default()
    };
    let timeline = compose(
        &sched,
        &catalog,
        &sources,
        canvas,
        &compose_options,
        &mut rng,
    )?;
    timeline.validate()?;

    let params = WriteParams {
        fps: request.target_fps,
        overwrite: true,
    };

    match execute(backend, &timeline, handles, &params, request) {
        Ok(()) => {}
        // Retry whenever the collage path was taken, even when every overlay
        // candidate was rejected and only geometrized primaries remain.
        Err(err) if request.overlay_enabled && sched.len() >= 2 => {
            tracing::warn!(%err, "backend render failed, retrying with simple concatenation");
            let fallback = compose(
                &sched,
                &catalog,
                &sources,
                canvas,
                &ComposeOptions {
                    overlay_enabled: false,
                    output_duration_cap: request.output_duration_cap,
                    ..ComposeOptions::default()
                },
                &mut rng,
            )?;
            execute(backend, &fallback, handles, &params, request).map_err(|second| {
                RemixError::backend(format!(
                    "fallback concatenation failed: {second} (collage attempt: {err})"
                ))
            })?;
        }
        Err(err) => return Err(err),
    }

    Ok(RenderOutcome {
        report: report(&sched),
        schedule: sched,
    })
}

/// Drive the backend through a timeline in deterministic emission order and
/// encode the result.
fn execute<B: MediaBackend>(
    backend: &mut B,
    timeline: &Timeline,
    handles: &BTreeMap<SourceId, B::Handle>,
    params: &WriteParams,
    request: &RemixRequest,
) -> RemixResult<()> {
    let mut slot_clips = Vec::with_capacity(timeline.slots.len());

    for slot in &timeline.slots {
        let slot_start = slot.primary.timeline_start;
        let mut layers = Vec::with_capacity(1 + slot.overlays.len());
        layers.push(build_layer(backend, handles, &slot.primary, slot_start)?);
        for overlay in &slot.overlays {
            layers.push(build_layer(backend, handles, overlay, slot_start)?);
        }
        slot_clips.push(backend.composite(layers, timeline.canvas)?);
    }

    let final_clip = backend.concatenate(slot_clips)?;
    backend.write(final_clip, &request.out_path, params)?;
    tracing::info!(out = %request.out_path.display(), "render complete");
    Ok(())
}

/// Turn one placement into a positioned, timed, faded clip. `set_start` is
/// relative to the slot: concatenation supplies the absolute offset.
fn build_layer<B: MediaBackend>(
    backend: &mut B,
    handles: &BTreeMap<SourceId, B::Handle>,
    placement: &Placement,
    slot_start: f64,
) -> RemixResult<B::Clip> {
    let handle = handles.get(&placement.segment.source_id).ok_or_else(|| {
        RemixError::source_unavailable(format!(
            "no open handle for source {}",
            placement.segment.source_id
        ))
    })?;

    let clip = backend.subclip(
        handle,
        placement.source_start,
        placement.source_start + placement.duration,
    )?;
    let clip = backend.resize(clip, placement.width, placement.height)?;
    let clip = backend.position(clip, placement.x, placement.y)?;
    let clip = backend.set_start(clip, placement.timeline_start - slot_start)?;
    backend.set_opacity(clip, placement.opacity)
}
