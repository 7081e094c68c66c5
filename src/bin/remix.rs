use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use remix::{
    FfmpegBackend, RemixRequest, ScheduleOptions, Source, SourceId, build_catalogs,
    parse_duration, render, report, rng_from_seed, schedule, simulation_log,
};

#[derive(Parser, Debug)]
#[command(name = "remix", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a reshuffle without touching any media: print the schedule manifest.
    Schedule(ScheduleArgs),
    /// Reshuffle real sources and encode the result (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    /// Source as NAME=DURATION, repeatable (duration as '330', '5:30' or '1:02:03').
    #[arg(long = "source", required = true)]
    sources: Vec<String>,

    /// Segment length (same duration syntax).
    #[arg(long = "segment-length")]
    segment_length: String,

    /// Seed for reproducible ordering.
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated per-source mix weights, in source order (e.g. '0.8,0.2').
    #[arg(long)]
    weights: Option<String>,

    /// Also print a dry-run processing log.
    #[arg(long)]
    simulate: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input media path, repeatable; the first input fixes the canvas size.
    #[arg(long = "in", required = true)]
    inputs: Vec<PathBuf>,

    /// Segment length ('330', '5:30' or '1:02:03').
    #[arg(long = "segment-length")]
    segment_length: String,

    /// Seed for reproducible ordering and geometry.
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated per-source mix weights, in input order.
    #[arg(long)]
    weights: Option<String>,

    /// Compose a layered collage instead of a plain concatenation.
    #[arg(long)]
    collage: bool,

    /// Target output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Cap output duration (duration syntax).
    #[arg(long = "max-duration")]
    max_duration: Option<String>,

    /// Output file path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Schedule(args) => cmd_schedule(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let segment_length =
        parse_duration(&args.segment_length).context("parse --segment-length")?;

    let mut sources = Vec::with_capacity(args.sources.len());
    for (i, spec) in args.sources.iter().enumerate() {
        let (name, duration) = spec
            .split_once('=')
            .with_context(|| format!("--source '{spec}' must be NAME=DURATION"))?;
        let total = parse_duration(duration)
            .with_context(|| format!("parse duration of --source '{spec}'"))?;
        sources.push(Source::new(SourceId(i as u32), name, total));
    }

    let weights = parse_weights(args.weights.as_deref(), sources.len())?;
    let catalog = build_catalogs(&sources, segment_length)?;
    let mut rng = rng_from_seed(args.seed);
    let sched = schedule(&catalog, &ScheduleOptions { weights }, &mut rng)?;

    print!("{}", report(&sched));
    if args.simulate {
        print!("{}", simulation_log(&sched));
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let segment_length =
        parse_duration(&args.segment_length).context("parse --segment-length")?;
    let output_duration_cap = args
        .max_duration
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("parse --max-duration")?;
    let weights = parse_weights(args.weights.as_deref(), args.inputs.len())?;

    let request = RemixRequest {
        inputs: args.inputs,
        segment_length,
        seed: args.seed,
        weights,
        overlay_enabled: args.collage,
        target_fps: args.fps,
        output_duration_cap,
        out_path: args.out,
    };

    let mut backend = FfmpegBackend::new();
    let outcome = render(&mut backend, &request)?;
    print!("{}", outcome.report);
    Ok(())
}

fn parse_weights(
    spec: Option<&str>,
    source_count: usize,
) -> anyhow::Result<Option<BTreeMap<SourceId, f64>>> {
    let Some(spec) = spec else {
        return Ok(None);
    };

    let mut weights = BTreeMap::new();
    for (i, part) in spec.split(',').enumerate() {
        let w: f64 = part
            .trim()
            .parse()
            .with_context(|| format!("invalid weight '{part}' in --weights"))?;
        weights.insert(SourceId(i as u32), w);
    }
    anyhow::ensure!(
        weights.len() == source_count,
        "--weights lists {} values for {} sources",
        weights.len(),
        source_count
    );
    Ok(Some(weights))
}
