//! Display logic for the domain-sweep CLI.
//!
//! Per-task result lines, the run header and the closing summary. Uses
//! only the `console` crate; everything here writes to stdout.

use console::{pad_str, style, Alignment};
use domain_sweep_lib::{Outcome, Progress, RouteTable, RunSummary, SweepConfig};

/// Width the `name + suffix` column is padded to.
const NAME_WIDTH: usize = 24;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(task_count: usize, config: &SweepConfig) {
    println!(
        "{} {} {}",
        style("domain-sweep").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· Checking {} name{}",
            task_count,
            if task_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );

    let mut meta_parts = vec![
        format!("Suffixes: {}", config.suffixes.join(", ")),
        format!("Concurrency: {}", config.concurrency),
        format!("Store: {}", config.store_path),
    ];
    if let Some(timeout) = config.timeout {
        meta_parts.push(format!("Timeout: {}s", timeout.as_secs()));
    }
    if config.skip_known {
        meta_parts.push("Skipping known".to_string());
    }

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Single result line ───────────────────────────────────────────────────────

/// Print one completed task.
pub fn print_task_line(progress: &Progress) {
    println!("{}", format_task_line(progress));
}

/// `[3/8] ✅ aa.loc.cc    1`, with the glyph, name and suffix first.
pub fn format_task_line(progress: &Progress) -> String {
    let name = pad_str(
        &progress.task.to_string(),
        NAME_WIDTH,
        Alignment::Left,
        None,
    )
    .into_owned();

    let counter = style(format!("[{}/{}]", progress.completed, progress.total)).dim();
    let glyph = progress.outcome.status().glyph();
    let detail = progress.outcome.detail();

    let styled_detail = match &progress.outcome {
        Outcome::Available { .. } => style(detail.to_string()).green(),
        Outcome::Unavailable { .. } => style(detail.to_string()).red(),
        Outcome::TransportError { .. } => style(detail.to_string()).yellow(),
    };

    format!("  {} {} {}  {}", counter, glyph, name, styled_detail)
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the one-line run summary.
pub fn print_summary(summary: &RunSummary, store_path: &str) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!("  {}", format_summary(summary));
    println!(
        "  {} {}",
        style("Results saved to").dim(),
        style(store_path).bold()
    );
}

pub fn format_summary(summary: &RunSummary) -> String {
    let completed = summary.completed();
    let mut line = format!(
        "{} check{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(completed).bold(),
        if completed == 1 { "" } else { "s" },
        summary.duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} available", summary.available)).green(),
        style("|").dim(),
        style(format!("{} unavailable", summary.unavailable)).red(),
        style("|").dim(),
        style(format!("{} failed", summary.failed)).yellow(),
    );
    if summary.skipped > 0 {
        line.push_str(&format!(
            "  {}  {}",
            style("|").dim(),
            style(format!("{} skipped", summary.skipped)).dim()
        ));
    }
    line
}

// ── Routes ───────────────────────────────────────────────────────────────────

/// Print the routing table used to resolve suffixes.
pub fn print_routes(routes: &RouteTable) {
    println!("{}", style("Registrar routes").yellow().bold());
    for (prefix, url) in routes.entries() {
        println!(
            "  {}  {}",
            style(pad_str(prefix, 14, Alignment::Left, None)).green(),
            url
        );
    }
}
