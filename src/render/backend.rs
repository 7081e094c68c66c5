use std::path::Path;

use crate::{foundation::core::Canvas, foundation::error::RemixResult};

/// Encode parameters forwarded to the backend's `write` call.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct WriteParams {
    /// Target output frame rate; `None` keeps the backend's default.
    pub fps: Option<u32>,
    /// Overwrite an existing output file.
    pub overwrite: bool,
}

/// The consumed media capability: decode, geometry, compose and encode are
/// all delegated here; the core never touches pixels.
///
/// Calls are synchronous and issued in a fixed, deterministic order (slot by
/// slot, primary then its secondaries). A handle is owned exclusively by the
/// session that opened it, and the session closes it on every exit path.
pub trait MediaBackend {
    /// An opened source, carrying intrinsic metadata.
    type Handle;
    /// An intermediate clip value flowing through the op chain.
    type Clip;

    /// Open a source for reading.
    fn open(&mut self, path: &Path) -> RemixResult<Self::Handle>;

    /// Intrinsic frame dimensions of an opened source.
    fn canvas_of(&self, handle: &Self::Handle) -> Canvas;

    /// Total duration of an opened source, seconds.
    fn duration_of(&self, handle: &Self::Handle) -> f64;

    /// Cut `[start, end)` (source seconds) out of a source.
    fn subclip(&mut self, handle: &Self::Handle, start: f64, end: f64) -> RemixResult<Self::Clip>;

    /// Scale a clip to `width x height` pixels.
    fn resize(&mut self, clip: Self::Clip, width: u32, height: u32) -> RemixResult<Self::Clip>;

    /// Pin a clip's top-left corner to `(x, y)` on the canvas.
    fn position(&mut self, clip: Self::Clip, x: u32, y: u32) -> RemixResult<Self::Clip>;

    /// Delay a clip to start at `t` seconds on the output timeline.
    fn set_start(&mut self, clip: Self::Clip, t: f64) -> RemixResult<Self::Clip>;

    /// Set a clip's opacity in `[0, 1]`.
    fn set_opacity(&mut self, clip: Self::Clip, opacity: f64) -> RemixResult<Self::Clip>;

    /// Layer clips (bottom first) over a canvas of the given size.
    fn composite(&mut self, clips: Vec<Self::Clip>, canvas: Canvas) -> RemixResult<Self::Clip>;

    /// Join clips back to back.
    fn concatenate(&mut self, clips: Vec<Self::Clip>) -> RemixResult<Self::Clip>;

    /// Encode a finished clip to `out_path`.
    fn write(&mut self, clip: Self::Clip, out_path: &Path, params: &WriteParams)
    -> RemixResult<()>;

    /// Release an opened source.
    fn close(&mut self, handle: Self::Handle) -> RemixResult<()>;
}
