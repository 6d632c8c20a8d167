//! Formatted terminal output for fit summaries.
//!
//! We keep formatting code in one place so:
//! - the engine code stays clean and testable
//! - output changes are localized

use crate::domain::{FitSummary, ObjectiveKind};

/// Format one fit: dataset size, objective minimum and per-parameter errors.
pub fn format_fit_summary(summary: &FitSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== decay-fit - {} ===\n", summary.title));
    out.push_str(&format!("Objective: {}\n", summary.kind.display_name()));
    out.push_str(&format!("Records: n={}\n", summary.n_records));
    out.push_str(&format!(
        "Minimum: {:.6} (after {} minimization{})\n",
        summary.objective_min,
        summary.minimizations,
        if summary.minimizations == 1 { "" } else { "s" }
    ));
    if summary.kind == ObjectiveKind::ChiSquared {
        if let (Some(dof), Some(reduced)) = (summary.dof, summary.reduced_objective()) {
            out.push_str(&format!("Chi2/dof: {reduced:.4} (dof={dof})\n"));
        }
    }

    out.push_str("\nParameters:\n");
    out.push_str(
        format!(
            "{:<10} {:>14} {:>14} {:>14} {:>14}\n",
            "name", "value", "grid_err", "curv_err", "profile_err"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<14} {:-<14} {:-<14} {:-<14}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for e in &summary.estimates {
        out.push_str(
            format!(
                "{:<10} {:>14.8} {:>14} {:>14} {:>14}\n",
                e.name,
                e.value,
                fmt_opt(e.grid_error),
                fmt_opt(e.curvature_error),
                fmt_opt(e.profile_error),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:.8}"),
        None => "-".to_string(),
    }
}
