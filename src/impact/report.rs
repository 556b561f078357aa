//! Markdown impact report (`possibleBreaks.md`).

use std::fmt::{self, Write as _};
use std::path::Path;

use chrono::{DateTime, Utc};

use super::{summary, PossibleBreak, Severity};
use crate::validation::relative_display;

/// Render breaks grouped critical → high → medium → low. Within a group,
/// breaks keep their input order. Paths are shown relative to `root`.
pub fn render_report(breaks: &[PossibleBreak], root: &Path, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    // formatting into a String only fails if a Display impl does
    if write_report(&mut out, breaks, root, generated_at).is_err() {
        tracing::warn!("impact report truncated");
    }
    out
}

fn write_report(
    out: &mut String,
    breaks: &[PossibleBreak],
    root: &Path,
    generated_at: DateTime<Utc>,
) -> fmt::Result {
    writeln!(out, "# Impact Analysis Report\n")?;
    writeln!(out, "Generated at: {}\n", generated_at.to_rfc3339())?;

    if breaks.is_empty() {
        out.push_str("## No Breaking Changes Detected\n\n");
        out.push_str("All candidates appear to be safe to quarantine.\n");
        return Ok(());
    }

    let s = summary(breaks);
    out.push_str("## Impact Summary\n\n");
    writeln!(out, "- **Total Breaking Changes**: {}", s.total)?;
    writeln!(out, "- **Critical**: {}", s.critical)?;
    writeln!(out, "- **High**: {}", s.high)?;
    writeln!(out, "- **Medium**: {}", s.medium)?;
    writeln!(out, "- **Low**: {}", s.low)?;
    writeln!(out, "- **Affected Files**: {}\n", s.affected_files.len())?;

    for severity in Severity::DESCENDING {
        let group: Vec<&PossibleBreak> = breaks.iter().filter(|b| b.severity == severity).collect();
        if group.is_empty() {
            continue;
        }

        writeln!(
            out,
            "## {} Severity Issues ({})\n",
            severity.as_str().to_uppercase(),
            group.len()
        )?;
        for (i, b) in group.iter().enumerate() {
            writeln!(out, "### {}. {}\n", i + 1, relative_display(&b.file_path, root))?;
            writeln!(out, "- **Type**: {}", b.break_type)?;
            writeln!(out, "- **Description**: {}", b.description)?;
            if !b.affected_files.is_empty() {
                out.push_str("- **Affected Files**:\n");
                for f in &b.affected_files {
                    writeln!(out, "  - `{}`", relative_display(f, root))?;
                }
            }
            if let Some(fix) = &b.suggested_fix {
                writeln!(out, "- **Suggested Fix**: {}", fix)?;
            }
            out.push('\n');
        }
    }
    Ok(())
}
