//! Show command handler

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use cilo_core::script::assemble_script;
use cilo_core::{Phase, ResolvedJob, resolve};
use cilo_runner::Config;
use cilo_runner::config::DockerConfig;

/// Resolve a job and print it
pub fn show_job(pipeline_path: &Path, job_name: &str, json: bool, config: &Config) -> Result<()> {
    let pipeline = super::load_pipeline(pipeline_path)?;
    let job = resolve(&pipeline, job_name)?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&job).context("Failed to serialize resolved job")?;
        println!("{}", rendered);
    } else {
        print_job_details(&job, &config.docker);
    }

    Ok(())
}

fn print_job_details(job: &ResolvedJob, docker: &DockerConfig) {
    println!("{}", format!("Job: {}", job.name).bold());

    match job.require_image() {
        Ok(image) => {
            let pulled = cilo_core::mirror::strip_mirror(image, &docker.mirrors);
            if pulled == image {
                println!("  {}: {}", "Image".cyan(), image);
            } else {
                println!("  {}: {} (pulled as {})", "Image".cyan(), image, pulled);
            }
        }
        Err(_) => println!("  {}: {}", "Image".cyan(), "missing".red()),
    }

    println!("  {}:", "Variables".cyan());
    if job.variables.is_empty() {
        println!("    {}", "none".dimmed());
    }
    for entry in &job.variables {
        println!("    {}", entry);
    }

    for phase in Phase::ALL {
        let declared = job.phase(phase).map(|p| p.lines().len()).unwrap_or(0);
        println!("  {}: {} line(s)", phase.key().cyan(), declared);
    }

    println!();
    println!("{}", "Script:".bold());
    println!("{}", assemble_script(job));
}
