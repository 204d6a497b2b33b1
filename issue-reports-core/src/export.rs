use std::io::Write;
use std::path::Path;
use serde::Serialize;
use issue_reports_common::Result;
use crate::creation_report::CreationReportView;
use crate::created_vs_resolved::CreatedVsResolvedView;

const DATE_FMT: &str = "%Y-%m-%d";

// --- headless summaries ---

pub fn write_creation_summary<W: Write>(out: &mut W, view: &CreationReportView) -> Result<()> {
    writeln!(out, "{:<16} {} ({})", "Project:", view.project_name, view.project_id)?;
    writeln!(out, "{:<16} {} .. {}", "Range:", view.start_date.format(DATE_FMT), view.end_date.format(DATE_FMT))?;
    writeln!(out, "{:<16} {} days", "Interval:", view.interval)?;
    writeln!(out, "{:<16} {}", "Max count:", view.max_count)?;
    for err in &view.errors {
        writeln!(out, "{:<16} {}", "Error:", err)?;
    }
    let heights = view.bar_heights();
    writeln!(out, "{:<12} {:>8} {:>8}", "bucket", "count", "height")?;
    for (i, (date, count)) in view.dates.iter().zip(&view.open_count).enumerate() {
        // no heights at all when every bucket is empty
        let h = heights.get(i).map_or("-".to_string(), |h| h.to_string());
        writeln!(out, "{:<12} {:>8} {:>8}", date.format(DATE_FMT).to_string(), count, h)?;
    }
    Ok(())
}

pub fn write_created_vs_resolved_summary<W: Write>(out: &mut W, view: &CreatedVsResolvedView) -> Result<()> {
    writeln!(out, "{:<16} {}", "Scope:", view.scope)?;
    writeln!(out, "{:<16} {} over {} days", "Period:", view.period, view.days_previous)?;
    writeln!(out, "{:<16} {}", "Created:", view.total_created)?;
    writeln!(out, "{:<16} {}", "Resolved:", view.total_resolved)?;
    writeln!(out, "{:<18} {:>8} {:>8} {:>10}", "period", "created", "resolved", "unresolved")?;
    for c in &view.periods {
        let trend = c.unresolved_trend.map_or("-".to_string(), |t| t.to_string());
        writeln!(out, "{:<18} {:>8} {:>8} {:>10}", c.start.format("%Y-%m-%d %H:%M").to_string(), c.created, c.resolved, trend)?;
    }
    Ok(())
}

pub fn print_creation_summary(view: &CreationReportView) -> Result<()> {
    write_creation_summary(&mut std::io::stdout().lock(), view)
}

pub fn print_created_vs_resolved_summary(view: &CreatedVsResolvedView) -> Result<()> {
    write_created_vs_resolved_summary(&mut std::io::stdout().lock(), view)
}

// --- JSON export ---

pub fn export_json<T: Serialize>(output_path: &Path, view: &T) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(file, view)?;
    Ok(())
}

// --- CSV export ---

pub fn export_csv(output_path: &Path, view: &CreationReportView) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    writeln!(file, "bucket_start,count,height")?;
    let heights = view.bar_heights();
    for (i, (date, count)) in view.dates.iter().zip(&view.open_count).enumerate() {
        let h = heights.get(i).map_or(String::new(), |h| h.to_string());
        writeln!(file, "{},{},{}", date.format(DATE_FMT), count, h)?;
    }
    Ok(())
}

