//! List command handler

use anyhow::Result;
use colored::*;
use std::path::Path;

/// Print the job names of a pipeline in document order
///
/// Jobs whose name starts with `.` are templates meant to be extended and
/// are shown dimmed.
pub fn list_jobs(pipeline_path: &Path) -> Result<()> {
    let pipeline = super::load_pipeline(pipeline_path)?;
    let names: Vec<&str> = pipeline.job_names().collect();

    if names.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} job(s):", names.len()).bold());
    for name in names {
        if name.starts_with('.') {
            println!("  {}", name.dimmed());
        } else {
            println!("  {}", name);
        }
    }

    Ok(())
}
