use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::{
    catalog::source::SourceId,
    foundation::time::{format_duration, format_range},
    schedule::scheduler::Schedule,
};

/// Render a schedule as a human-readable manifest.
///
/// A pure projection for display or export: per-source segment counts and
/// durations, every scheduled entry with its original and new time ranges,
/// and a grand total. An empty schedule yields a zero-segment report rather
/// than an error; the reporter has no effect on scheduling or composition.
pub fn report(schedule: &Schedule) -> String {
    let mut out = String::from("RESHUFFLE SCHEDULE\n");

    // Per-source aggregates, keyed for stable output order.
    let mut per_source: BTreeMap<SourceId, (String, usize, f64)> = BTreeMap::new();
    for seg in &schedule.entries {
        let entry = per_source
            .entry(seg.source_id)
            .or_insert_with(|| (seg.source_name.clone(), 0, 0.0));
        entry.1 += 1;
        entry.2 += seg.duration;
    }

    out.push_str("sources:\n");
    if per_source.is_empty() {
        out.push_str("  (none)\n");
    }
    for (_, (name, count, duration)) in &per_source {
        let _ = writeln!(
            out,
            "  {name}: {count} segments, {}",
            format_duration(*duration)
        );
    }

    out.push_str("sequence:\n");
    let mut current = 0.0;
    for (pos, seg) in schedule.entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>3}. {} #{} | {} -> {}",
            pos + 1,
            seg.source_name,
            seg.index,
            format_range(seg.start, seg.end),
            format_range(current, current + seg.duration),
        );
        current += seg.duration;
    }

    let _ = writeln!(
        out,
        "total: {} segments, {}",
        schedule.entries.len(),
        format_duration(current)
    );
    out
}

/// Render a dry-run processing log, one line per scheduled segment.
///
/// Mirrors what a real render session would do, without touching any backend.
pub fn simulation_log(schedule: &Schedule) -> String {
    let mut out = String::from("simulated render\n");
    let total = schedule.entries.len();
    for (pos, seg) in schedule.entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "  processing {} #{} ({}/{total})",
            seg.source_name,
            seg.index,
            pos + 1,
        );
    }
    out.push_str("simulation complete\n");
    out
}
