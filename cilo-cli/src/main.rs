//! Cilo CLI
//!
//! Runs a single job of a CI pipeline file locally, inside a container.

mod commands;

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cilo_runner::JobError;
use commands::{Commands, handle_command};

#[derive(Parser)]
#[command(name = "cilo")]
#[command(about = "Run a CI pipeline job locally in a container", long_about = None)]
struct Cli {
    /// Tool configuration file (container binary, registry mirrors)
    #[arg(long, global = true, env = "CILO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the job's own output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cilo_cli=info,cilo_runner=info,cilo_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match handle_command(cli.command, cli.config.as_deref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Process exit code for an error: the script's own code when it failed, 1 otherwise
fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<JobError>()
        .map(JobError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code() {
        let err = anyhow::Error::new(JobError::ScriptFailed { code: Some(42) });
        assert_eq!(exit_code(&err), 42);

        let err = Err::<(), _>(JobError::ScriptFailed { code: Some(3) })
            .context("Job 'build' failed")
            .unwrap_err();
        assert_eq!(exit_code(&err), 3);

        let err = anyhow::Error::new(JobError::ScriptFailed { code: Some(300) });
        assert_eq!(exit_code(&err), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "cilo",
            "--config",
            "cilo.yml",
            "run",
            ".gitlab-ci.yml",
            "build",
            "--repo",
            "/src",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("cilo.yml")));
        assert!(matches!(cli.command, Commands::Run { ref job, .. } if job == "build"));
    }

    #[test]
    fn test_cli_requires_job_name() {
        assert!(Cli::try_parse_from(["cilo", "run", ".gitlab-ci.yml"]).is_err());
    }
}
