//! Run command handler

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cilo_core::resolve;
use cilo_runner::{CliRuntime, Config, ContainerRuntime, JobExecutor, OutputSinks};

/// Resolve a job and run it in a container
///
/// # Arguments
/// * `pipeline_path` - The pipeline file
/// * `job_name` - The job to run
/// * `repo` - Repository directory override
/// * `config` - Tool configuration
pub async fn run_job(
    pipeline_path: &Path,
    job_name: &str,
    repo: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let pipeline = super::load_pipeline(pipeline_path)?;
    let job = resolve(&pipeline, job_name)?;

    let runtime = Arc::new(CliRuntime::new(config.docker.binary.clone()));
    runtime
        .version()
        .await
        .with_context(|| format!("Container runtime '{}' is not available", runtime.binary()))?;

    let repo = repo.unwrap_or_else(|| repository_dir(pipeline_path));
    let executor = JobExecutor::new(runtime, config.clone());

    executor
        .run(&job, &repo, OutputSinks::stdio())
        .await
        .with_context(|| format!("Job '{}' failed", job_name))?;

    eprintln!("{} {}", "Job succeeded:".green().bold(), job_name);
    Ok(())
}

/// Directory holding the pipeline file
fn repository_dir(pipeline_path: &Path) -> PathBuf {
    match pipeline_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_dir() {
        assert_eq!(
            repository_dir(Path::new("/src/app/.gitlab-ci.yml")),
            PathBuf::from("/src/app")
        );
        assert_eq!(repository_dir(Path::new(".gitlab-ci.yml")), PathBuf::from("."));
        assert_eq!(
            repository_dir(Path::new("ci/pipeline.yml")),
            PathBuf::from("ci")
        );
    }
}
