use std::fmt::Write;

use comfy_table::Cell;

use crate::periodics::{JobIdentity, UNKNOWN_PLATFORM};
use crate::pipeline::PeriodicsReport;

use super::styling::{bright, bright_yellow, cyan, dim, styled_pass_rate};
use super::tables::{color_coded_pass_rate_cell, create_table, cyan_header, pass_rate};

/// Prints a human-readable preview of the report to stdout.
///
/// Shows an overview, a per-version pass table and the message text exactly
/// as it would be posted.
pub fn print_summary(report: &PeriodicsReport) {
    println!("{}", render_summary(report));
}

/// Prints discovered jobs and how their names were classified.
pub fn print_jobs(identities: &[JobIdentity]) {
    println!("{}", render_jobs(identities));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_summary(report: &PeriodicsReport) -> String {
    let mut output = String::new();
    let totals = &report.totals;

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Window:"),
        cyan(format!("last {} hours", report.window_hours)),
        dim("Jobs discovered:"),
        bright_yellow(report.total_jobs),
        dim("Jobs with recent runs:"),
        bright_yellow(report.reported_jobs),
        dim("Versions reported:"),
        bright_yellow(report.tree.len()),
        dim("Runs passed:"),
        styled_pass_rate(totals.total_passed, totals.total),
        dim("Collected at:"),
        dim(report.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if report.tree.is_empty() {
        let _ = writeln!(
            output,
            "{}",
            bright_yellow(format!(
                "No executions in the last {} hours.",
                report.window_hours
            ))
        );
        return output;
    }

    add_section_header(&mut output, "🧪", "Versions");
    let mut table = create_table();
    table.set_header(cyan_header(&["Version", "Passed", "Total", "Pass rate"]));
    for (version, version_totals) in &totals.per_version {
        table.add_row(vec![
            Cell::new(version),
            Cell::new(version_totals.passed),
            Cell::new(version_totals.total),
            color_coded_pass_rate_cell(pass_rate(version_totals.passed, version_totals.total)),
        ]);
    }
    let _ = writeln!(output, "{table}\n");

    if !report.idle_versions.is_empty() {
        let _ = writeln!(
            output,
            "  {} {}\n",
            dim("No recent runs:"),
            bright_yellow(report.idle_versions.join(", "))
        );
    }

    add_section_header(&mut output, "💬", "Message");
    let _ = writeln!(output, "{}", report.headline);
    for block in &report.text_summary {
        output.push_str(block);
    }

    output
}

fn render_jobs(identities: &[JobIdentity]) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📋", "Periodic Jobs");
    if identities.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No periodic jobs found."));
        return output;
    }

    let mut table = create_table();
    table.set_header(cyan_header(&["Job", "Version", "Platform", "Variant"]));
    for identity in identities {
        table.add_row(vec![
            Cell::new(&identity.full_name),
            Cell::new(&identity.version),
            Cell::new(identity.platform.as_deref().unwrap_or(UNKNOWN_PLATFORM)),
            Cell::new(&identity.variant),
        ]);
    }
    let _ = writeln!(output, "{table}");

    output
}
