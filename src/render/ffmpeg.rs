use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::{
    foundation::core::Canvas,
    foundation::error::{RemixError, RemixResult},
    render::backend::{MediaBackend, WriteParams},
};

/// Media backend driven by the system `ffmpeg` binary.
///
/// Clip operations accumulate a pure filter-graph plan; nothing is decoded
/// until `write`, which assembles one `ffmpeg -filter_complex` invocation and
/// runs it. Probing uses `ffprobe`. We intentionally shell out rather than
/// link FFmpeg to avoid native dev header/lib requirements.
#[derive(Debug, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

/// An opened (probed) source.
#[derive(Clone, Debug)]
pub struct FfmpegHandle {
    path: PathBuf,
    canvas: Canvas,
    duration: f64,
}

/// A node in the accumulated filter-graph plan.
#[derive(Clone, Debug)]
pub enum FfmpegClip {
    /// One trimmed, scaled, positioned, delayed, faded layer.
    Leaf {
        source: PathBuf,
        start: f64,
        end: f64,
        size: Option<(u32, u32)>,
        pos: (u32, u32),
        delay: f64,
        opacity: f64,
    },
    /// Layers (bottom first) over a fixed-size canvas.
    Composite {
        layers: Vec<FfmpegClip>,
        canvas: Canvas,
    },
    /// Parts joined back to back.
    Concat { parts: Vec<FfmpegClip> },
}

impl FfmpegClip {
    fn as_leaf_mut(
        &mut self,
        op: &str,
    ) -> RemixResult<(
        &mut Option<(u32, u32)>,
        &mut (u32, u32),
        &mut f64,
        &mut f64,
    )> {
        match self {
            FfmpegClip::Leaf {
                size,
                pos,
                delay,
                opacity,
                ..
            } => Ok((size, pos, delay, opacity)),
            _ => Err(RemixError::backend(format!(
                "{op} applies to source clips, not composed ones"
            ))),
        }
    }

    /// The node's own duration on its local timeline.
    fn duration(&self) -> f64 {
        match self {
            FfmpegClip::Leaf {
                start, end, delay, ..
            } => delay + (end - start),
            FfmpegClip::Composite { layers, .. } => {
                layers.iter().map(|l| l.duration()).fold(0.0, f64::max)
            }
            FfmpegClip::Concat { parts } => parts.iter().map(|p| p.duration()).sum(),
        }
    }
}

impl MediaBackend for FfmpegBackend {
    type Handle = FfmpegHandle;
    type Clip = FfmpegClip;

    fn open(&mut self, path: &Path) -> RemixResult<Self::Handle> {
        let (canvas, duration) = probe(path)?;
        Ok(FfmpegHandle {
            path: path.to_path_buf(),
            canvas,
            duration,
        })
    }

    fn canvas_of(&self, handle: &Self::Handle) -> Canvas {
        handle.canvas
    }

    fn duration_of(&self, handle: &Self::Handle) -> f64 {
        handle.duration
    }

    fn subclip(&mut self, handle: &Self::Handle, start: f64, end: f64) -> RemixResult<Self::Clip> {
        if !(0.0..=handle.duration + 1e-6).contains(&start) || end < start {
            return Err(RemixError::backend(format!(
                "subclip [{start}, {end}) outside source '{}'",
                handle.path.display()
            )));
        }
        Ok(FfmpegClip::Leaf {
            source: handle.path.clone(),
            start,
            end,
            size: None,
            pos: (0, 0),
            delay: 0.0,
            opacity: 1.0,
        })
    }

    fn resize(&mut self, mut clip: Self::Clip, width: u32, height: u32) -> RemixResult<Self::Clip> {
        let (size, ..) = clip.as_leaf_mut("resize")?;
        *size = Some((width, height));
        Ok(clip)
    }

    fn position(&mut self, mut clip: Self::Clip, x: u32, y: u32) -> RemixResult<Self::Clip> {
        let (_, pos, ..) = clip.as_leaf_mut("position")?;
        *pos = (x, y);
        Ok(clip)
    }

    fn set_start(&mut self, mut clip: Self::Clip, t: f64) -> RemixResult<Self::Clip> {
        let (_, _, delay, _) = clip.as_leaf_mut("set_start")?;
        *delay = t.max(0.0);
        Ok(clip)
    }

    fn set_opacity(&mut self, mut clip: Self::Clip, value: f64) -> RemixResult<Self::Clip> {
        let (.., opacity) = clip.as_leaf_mut("set_opacity")?;
        *opacity = value.clamp(0.0, 1.0);
        Ok(clip)
    }

    fn composite(&mut self, clips: Vec<Self::Clip>, canvas: Canvas) -> RemixResult<Self::Clip> {
        if clips.is_empty() {
            return Err(RemixError::backend("composite needs at least one clip"));
        }
        Ok(FfmpegClip::Composite {
            layers: clips,
            canvas,
        })
    }

    fn concatenate(&mut self, clips: Vec<Self::Clip>) -> RemixResult<Self::Clip> {
        if clips.is_empty() {
            return Err(RemixError::backend("concatenate needs at least one clip"));
        }
        Ok(FfmpegClip::Concat { parts: clips })
    }

    fn write(
        &mut self,
        clip: Self::Clip,
        out_path: &Path,
        params: &WriteParams,
    ) -> RemixResult<()> {
        if !is_ffmpeg_on_path() {
            return Err(RemixError::backend(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }

        let plan = FilterPlan::build(&clip)?;
        let mut cmd = Command::new("ffmpeg");
        cmd.args(plan.args(out_path, params));

        let out = cmd
            .output()
            .map_err(|e| RemixError::backend(format!("failed to spawn ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(RemixError::backend(format!(
                "ffmpeg exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }

    fn close(&mut self, _handle: Self::Handle) -> RemixResult<()> {
        // Probed handles hold no OS resources; the process owns nothing to
        // release beyond the plan itself.
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn probe(path: &Path) -> RemixResult<(Canvas, f64)> {
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| RemixError::source_unavailable(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(RemixError::source_unavailable(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| RemixError::source_unavailable(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            RemixError::source_unavailable(format!("no video stream in '{}'", path.display()))
        })?;
    let canvas = Canvas::new(video.width.unwrap_or(0), video.height.unwrap_or(0))?;
    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    Ok((canvas, duration))
}

/// A fully assembled `-filter_complex` invocation.
struct FilterPlan {
    inputs: Vec<PathBuf>,
    filtergraph: String,
    out_label: String,
}

impl FilterPlan {
    fn build(clip: &FfmpegClip) -> RemixResult<Self> {
        let mut plan = FilterPlan {
            inputs: Vec::new(),
            filtergraph: String::new(),
            out_label: String::new(),
        };
        let mut label_seq = 0usize;
        plan.out_label = plan.emit(clip, &mut label_seq)?;
        Ok(plan)
    }

    /// Emit filtergraph text for a node and return its output label.
    fn emit(&mut self, clip: &FfmpegClip, seq: &mut usize) -> RemixResult<String> {
        match clip {
            FfmpegClip::Leaf {
                source,
                start,
                end,
                size,
                pos: _,
                delay,
                opacity,
            } => {
                let input = self.input_index(source);
                let label = self.next_label(seq);
                let mut chain = format!(
                    "[{input}:v]trim=start={start:.3}:end={end:.3},setpts=PTS-STARTPTS"
                );
                if *delay > 0.0 {
                    let _ = write!(chain, "+{delay:.3}/TB");
                }
                if let Some((w, h)) = size {
                    let _ = write!(chain, ",scale={w}:{h}");
                }
                if *opacity < 1.0 {
                    let _ = write!(
                        chain,
                        ",format=rgba,colorchannelmixer=aa={opacity:.3}"
                    );
                }
                let _ = writeln!(self.filtergraph, "{chain}[{label}];");
                Ok(label)
            }
            FfmpegClip::Composite { layers, canvas } => {
                let duration = clip.duration();
                let mut base = self.next_label(seq);
                let _ = writeln!(
                    self.filtergraph,
                    "color=c=black:s={}x{}:d={duration:.3}[{base}];",
                    canvas.width, canvas.height
                );
                for layer in layers {
                    let (x, y) = match layer {
                        FfmpegClip::Leaf { pos, .. } => *pos,
                        _ => (0, 0),
                    };
                    let layer_label = self.emit(layer, seq)?;
                    let merged = self.next_label(seq);
                    let _ = writeln!(
                        self.filtergraph,
                        "[{base}][{layer_label}]overlay=x={x}:y={y}:eof_action=pass[{merged}];"
                    );
                    base = merged;
                }
                Ok(base)
            }
            FfmpegClip::Concat { parts } => {
                let mut labels = Vec::with_capacity(parts.len());
                for part in parts {
                    labels.push(self.emit(part, seq)?);
                }
                if labels.len() == 1 {
                    return Ok(labels.remove(0));
                }
                let out = self.next_label(seq);
                let joined: String = labels.iter().map(|l| format!("[{l}]")).collect();
                let _ = writeln!(
                    self.filtergraph,
                    "{joined}concat=n={}:v=1:a=0[{out}];",
                    labels.len()
                );
                Ok(out)
            }
        }
    }

    fn input_index(&mut self, source: &Path) -> usize {
        if let Some(i) = self.inputs.iter().position(|p| p == source) {
            return i;
        }
        self.inputs.push(source.to_path_buf());
        self.inputs.len() - 1
    }

    fn next_label(&mut self, seq: &mut usize) -> String {
        let label = format!("v{seq}");
        *seq += 1;
        label
    }

    fn args(&self, out_path: &Path, params: &WriteParams) -> Vec<String> {
        let mut args = vec!["-loglevel".into(), "error".into()];
        args.push(if params.overwrite { "-y" } else { "-n" }.into());
        for input in &self.inputs {
            args.push("-i".into());
            args.push(input.display().to_string());
        }
        args.push("-filter_complex".into());
        args.push(self.filtergraph.trim_end().trim_end_matches(';').to_string());
        args.push("-map".into());
        args.push(format!("[{}]", self.out_label));
        if let Some(fps) = params.fps {
            args.push("-r".into());
            args.push(fps.to_string());
        }
        args.extend(
            [
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]
            .map(String::from),
        );
        args.push(out_path.display().to_string());
        args
    }
}
