//! Output formatting helpers for CLI commands

use crate::stream::StreamState;
use crate::summary::{Readiness, Summary};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use std::fmt::Write;

/// Log lines shown below the table
const LOG_TAIL: usize = 5;

/// Human-readable byte count (`1.5 KiB`, `3.0 MiB`)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Colored one-line readiness indicator
pub fn readiness_line(readiness: Readiness) -> String {
    match readiness {
        Readiness::Ready => format!("{} {}", "✓".green(), readiness),
        Readiness::NoData => format!("{} {}", "…".yellow(), readiness),
        Readiness::NotConnected => format!("{} {}", "✗".red(), readiness),
    }
}

fn state_cell(state: StreamState) -> String {
    match state {
        StreamState::Streaming => "Streaming".green().to_string(),
        StreamState::Connecting => "Connecting".yellow().to_string(),
        StreamState::Backoff => "Backoff".red().to_string(),
        StreamState::Idle => "Idle".dimmed().to_string(),
    }
}

/// Format per-stream status as a table
pub fn format_streams_table(summary: &Summary) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Stream", "State", "Buffered", "Messages", "Errors", "Attempts",
    ]);

    for s in &summary.streams {
        table.add_row(vec![
            Cell::new(s.name),
            Cell::new(state_cell(s.state)),
            Cell::new(format!("{}/{}", s.len, s.capacity)),
            Cell::new(s.stats.messages),
            Cell::new(s.stats.decode_errors),
            Cell::new(s.stats.connect_attempts),
        ]);
    }

    table.to_string()
}

/// Format a summary as pretty text
pub fn format_summary_pretty(summary: &Summary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{}", readiness_line(summary.readiness));
    let version = summary.version.as_deref().unwrap_or("unknown");
    let flavor = if summary.is_meta { " (meta)" } else { "" };
    let _ = writeln!(output, "Version: {}{}", version, flavor);

    if let Some(traffic) = summary.traffic {
        let _ = writeln!(
            output,
            "Traffic: ↑ {}/s  ↓ {}/s",
            format_bytes(traffic.up),
            format_bytes(traffic.down)
        );
    }
    if let Some(totals) = summary.connections {
        let _ = writeln!(
            output,
            "Connections: {} active, ↑ {} total, ↓ {} total",
            totals.active,
            format_bytes(totals.upload_total),
            format_bytes(totals.download_total)
        );
    }
    if let Some(memory) = summary.memory {
        let _ = writeln!(output, "Memory: {}", format_bytes(memory.in_use));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{}", format_streams_table(summary));

    let skip = summary.logs.len().saturating_sub(LOG_TAIL);
    if skip < summary.logs.len() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Recent logs:");
        for line in &summary.logs[skip..] {
            let _ = writeln!(
                output,
                "  {} [{}] {}",
                line.timestamp.format("%H:%M:%S"),
                line.level,
                line.payload
            );
        }
    }

    output
}

/// Format a summary as JSON
pub fn format_summary_json(summary: &Summary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
