//! Remix rearranges the temporal content of timed media sources into a new,
//! randomized playback sequence, optionally composing a layered collage in
//! which a primary timeline element is joined by secondary, randomly placed
//! and sized overlay elements.
//!
//! # Pipeline overview
//!
//! 1. **Catalog**: slice each source's duration into addressable segments
//!    ([`build_catalog`] / [`build_catalogs`])
//! 2. **Schedule**: produce one seeded, optionally weighted total ordering of
//!    all segments across sources ([`schedule`])
//! 3. **Compose**: expand the ordering into a geometrically valid placement
//!    timeline ([`compose`]), or report it as text ([`report`])
//! 4. **Render** (optional): drive a [`MediaBackend`] through the timeline,
//!    slot by slot ([`render`]); [`FfmpegBackend`] shells out to the system
//!    `ffmpeg` binary
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-when-seeded**: every randomized decision flows through
//!   one explicit [`rand::rngs::StdRng`], built by [`rng_from_seed`]; the
//!   same seed over the same inputs reproduces the same output.
//! - **No pixels in the core**: decode, resize, compose and encode are
//!   delegated to the backend; the core only plans.
//! - **Single-threaded**: calls into the backend are synchronous and issued
//!   in a fixed, reproducible order.
#![forbid(unsafe_code)]

mod catalog;
mod foundation;
mod render;
mod schedule;
mod timeline;

pub use catalog::builder::{build_catalog, build_catalogs};
pub use catalog::source::{Segment, SegmentId, Source, SourceId};
pub use foundation::core::{Canvas, MIN_OVERLAY_SEC, MIN_SIGNIFICANT_SEC, TimeRange};
pub use foundation::error::{RemixError, RemixResult};
pub use foundation::time::{format_duration, format_range, parse_duration};
pub use render::backend::{MediaBackend, WriteParams};
pub use render::ffmpeg::{FfmpegBackend, FfmpegClip, FfmpegHandle, is_ffmpeg_on_path};
pub use render::session::{RemixRequest, RenderOutcome, render};
pub use schedule::report::{report, simulation_log};
pub use schedule::scheduler::{Schedule, ScheduleOptions, rng_from_seed, schedule};
pub use timeline::compose::{ComposeOptions, ShapeProfile, compose};
pub use timeline::model::{Placement, PlacementKind, Slot, Timeline};
