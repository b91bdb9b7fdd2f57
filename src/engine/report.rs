//! Human-readable run report: summary, pattern analysis, risk assessment,
//! trends, recommendations and errors.

use std::fmt::Write;

use crate::engine::metrics::RunMetrics;

/// Render the multi-section plain-text report.
#[must_use]
pub fn render(metrics: &RunMetrics) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, metrics);
    out
}

fn write_report(out: &mut String, m: &RunMetrics) -> std::fmt::Result {
    writeln!(out, "== Summary ==")?;
    writeln!(out, "run:              {}", m.run_id)?;
    writeln!(out, "target:           {}", m.target_dir.display())?;
    writeln!(
        out,
        "mode:             {}{}",
        m.execution_mode,
        if m.dry_run { " (dry run)" } else { "" }
    )?;
    writeln!(out, "status:           {}", m.status)?;
    writeln!(out, "files found:      {}", m.files_found)?;
    writeln!(out, "files deleted:    {}", m.files_deleted)?;
    writeln!(out, "files backed up:  {}", m.files_backed_up)?;
    writeln!(out, "files skipped:    {}", m.files_skipped)?;
    writeln!(out, "bytes processed:  {}", m.bytes_processed)?;
    writeln!(out, "hashes generated: {}", m.hashes_generated)?;
    writeln!(
        out,
        "parallel ops:     {} (peak in flight {})",
        m.parallel_operations, m.max_in_flight
    )?;
    writeln!(out, "audit entries:    {}", m.audit_entries)?;
    writeln!(out, "duration:         {} ms", m.duration_ms)?;
    for s in &m.strategies {
        writeln!(
            out,
            "strategy {:<13} {} found, {} new",
            s.strategy, s.discovered, s.new_candidates
        )?;
    }

    writeln!(out, "\n== Pattern Analysis ==")?;
    if m.pattern_counts.is_empty() {
        writeln!(out, "(none)")?;
    }
    for (category, count) in &m.pattern_counts {
        writeln!(out, "{category:<12} {count}")?;
    }

    writeln!(out, "\n== Risk Assessment ==")?;
    writeln!(out, "low:    {}", m.risk.low)?;
    writeln!(out, "medium: {}", m.risk.medium)?;
    writeln!(out, "high:   {}", m.risk.high)?;

    writeln!(out, "\n== Trends ==")?;
    match &m.trends {
        Some(t) => {
            writeln!(out, "size:      {}", t.size_trend)?;
            writeln!(out, "age:       {}", t.age_trend)?;
            writeln!(out, "frequency: {}", t.frequency_trend)?;
        }
        None => writeln!(out, "(not analyzed)")?,
    }

    writeln!(out, "\n== Recommendations ==")?;
    if m.recommendations.is_empty() {
        writeln!(out, "(none)")?;
    }
    for r in &m.recommendations {
        writeln!(out, "- {r}")?;
    }

    writeln!(out, "\n== Errors ==")?;
    if m.errors.is_empty() && m.warnings.is_empty() {
        writeln!(out, "(none)")?;
    }
    for e in &m.errors {
        writeln!(out, "[{}] {}: {}", e.code, e.kind, e.message)?;
    }
    for w in &m.warnings {
        writeln!(out, "warning [{}] {}: {}", w.code, w.kind, w.message)?;
    }
    for path in &m.remaining_artifacts {
        writeln!(out, "remaining: {}", path.display())?;
    }
    Ok(())
}
