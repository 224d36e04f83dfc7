//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod list;
mod run;
mod show;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use cilo_core::{Pipeline, parse_pipeline};
use cilo_runner::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a job in a container
    Run {
        /// Pipeline file (e.g. .gitlab-ci.yml)
        pipeline: PathBuf,

        /// Name of the job to run
        job: String,

        /// Repository directory mounted into the container
        /// (defaults to the pipeline file's directory)
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    /// Show a job after inheritance is applied, without running it
    Show {
        /// Pipeline file
        pipeline: PathBuf,

        /// Name of the job to show
        job: String,

        /// Print the resolved job as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the jobs of a pipeline
    List {
        /// Pipeline file
        pipeline: PathBuf,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config_path` - Tool configuration file, if any
pub async fn handle_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Run {
            pipeline,
            job,
            repo,
        } => {
            let config = load_config(config_path)?;
            run::run_job(&pipeline, &job, repo, &config).await
        }
        Commands::Show {
            pipeline,
            job,
            json,
        } => {
            let config = load_config(config_path)?;
            show::show_job(&pipeline, &job, json, &config)
        }
        Commands::List { pipeline } => list::list_jobs(&pipeline),
    }
}

/// Loads the tool configuration, falling back to defaults without a file
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    }
}

/// Reads and parses a pipeline file
fn load_pipeline(path: &Path) -> Result<Pipeline> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;

    parse_pipeline(&source).with_context(|| format!("Invalid pipeline file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_pipeline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "build:\n  image: alpine\n  script: [make]").unwrap();

        let pipeline = load_pipeline(file.path()).unwrap();
        assert_eq!(pipeline.job_names().collect::<Vec<_>>(), vec!["build"]);
    }

    #[test]
    fn test_load_pipeline_errors_name_the_file() {
        let err = load_pipeline(Path::new("/nonexistent/.gitlab-ci.yml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/.gitlab-ci.yml"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- not\n- a mapping").unwrap();
        let err = load_pipeline(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid pipeline file"));
    }
}
