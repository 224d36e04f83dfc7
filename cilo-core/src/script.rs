//! Script assembly
//!
//! Concatenates a resolved job's `before_script`, `script` and
//! `after_script` phases into the body of one shell script.

use tracing::info;

use crate::domain::job::{Phase, ResolvedJob};

/// Assemble the executable script body of a job
///
/// Phases are emitted in their fixed order and joined with newlines.
/// Absent or empty phases are skipped with a notice.
pub fn assemble_script(job: &ResolvedJob) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for phase in Phase::ALL {
        match job.phase(phase) {
            Some(declared) if !declared.is_empty() => lines.extend(declared.lines()),
            _ => info!("No job '{}'", phase),
        }
    }

    lines.join("\n")
}
