//! Command-line container runtime
//!
//! Drives a `docker` or `podman` binary:
//! - `pull` for images, decoding its output into progress events; both
//!   streams are read since docker prints progress on stdout and podman on
//!   stderr
//! - `create` with env, working directory and bind mounts
//! - `start --attach` for the run itself; stdout and stderr of the
//!   attached process are the container's streams and its exit status is
//!   the container's exit status
//! - `rm -f` for teardown, also performed on drop for anything left over

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    AttachedOutput, ContainerHandle, ContainerRuntime, ContainerSpec, ExitStatus, ProgressEvent,
    ProgressStream,
};
use crate::error::RuntimeError;

/// Progress events buffered between the pull process and the renderer
const PULL_BUFFER: usize = 64;

/// Container runtime backed by a container CLI
pub struct CliRuntime {
    binary: String,

    /// Attached `start` processes: container id -> process
    attached: Mutex<HashMap<String, Child>>,

    /// Containers created and not yet removed
    created: Mutex<HashSet<String>>,
}

impl CliRuntime {
    /// Creates a runtime driving the given binary (e.g. "docker", "podman")
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            attached: Mutex::new(HashMap::new()),
            created: Mutex::new(HashSet::new()),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Runs a runtime command to completion and returns its trimmed stdout
    async fn run(&self, args: &[String]) -> Result<String, RuntimeError> {
        let command = self.command_line(args);
        debug!("Running {}", command);

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !stderr.is_empty() {
            debug!("{} stderr: {}", command, stderr);
        }

        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(stdout)
    }
}

/// Builds the arguments of `create` for a container spec
pub(crate) fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_string(), "--name".to_string(), spec.name.clone()];

    for entry in &spec.env {
        args.push("--env".to_string());
        args.push(entry.clone());
    }

    args.push("--workdir".to_string());
    args.push(spec.working_dir.clone());

    for mount in &spec.mounts {
        let mut option = format!(
            "type=bind,source={},target={}",
            mount.source.display(),
            mount.target
        );
        if mount.read_only {
            option.push_str(",readonly");
        }
        args.push("--mount".to_string());
        args.push(option);
    }

    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

/// Decodes one line of `pull` output
///
/// JSON lines are engine progress records; an `error` field in one is a
/// registry failure. Plain lines of the form `<layer id>: <status>` become
/// a status with the layer id as progress, anything else is a bare status.
/// Blank lines yield nothing.
pub(crate) fn decode_pull_line(line: &str) -> Option<Result<ProgressEvent, RuntimeError>> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }

    if line.starts_with('{') {
        #[derive(serde::Deserialize)]
        struct WireEvent {
            #[serde(flatten)]
            event: ProgressEvent,
            error: Option<String>,
        }

        return Some(match serde_json::from_str::<WireEvent>(line) {
            Ok(WireEvent {
                error: Some(message),
                ..
            }) => Err(RuntimeError::Registry(message)),
            Ok(wire) => Ok(wire.event),
            Err(e) => Err(RuntimeError::Decode(e)),
        });
    }

    if let Some((id, status)) = line.split_once(": ") {
        if is_layer_id(id) {
            return Some(Ok(ProgressEvent::new(status.trim(), id)));
        }
    }

    Some(Ok(ProgressEvent::new(line, "")))
}

/// Forwards status lines of a pull's stderr as progress and returns the full text
///
/// Undecodable lines are kept for the error message only; the exit status
/// decides whether the pull failed.
async fn relay_pull_stderr(
    stderr: Option<ChildStderr>,
    sender: mpsc::Sender<Result<ProgressEvent, RuntimeError>>,
) -> String {
    let mut text = String::new();
    let Some(stderr) = stderr else {
        return text;
    };

    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(Ok(event)) = decode_pull_line(&line) {
            let _ = sender.send(Ok(event)).await;
        }
        text.push_str(&line);
        text.push('\n');
    }

    text
}

fn is_layer_id(id: &str) -> bool {
    id.len() >= 12 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    async fn version(&self) -> Result<String, RuntimeError> {
        let version = self.run(&["--version".to_string()]).await?;
        info!("Container runtime is available: {}", version);
        Ok(version)
    }

    async fn pull_image(&self, reference: &str) -> Result<ProgressStream, RuntimeError> {
        let args = vec!["pull".to_string(), reference.to_string()];
        let command = self.command_line(&args);
        debug!("Running {}", command);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (sender, stream) = ProgressStream::channel(PULL_BUFFER);

        tokio::spawn(async move {
            // podman reports progress on stderr, docker on stdout
            let stderr_task = tokio::spawn(relay_pull_stderr(stderr, sender.clone()));

            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            let Some(item) = decode_pull_line(&line) else {
                                continue;
                            };
                            let terminal = item.is_err();
                            if sender.send(item).await.is_err() || terminal {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            let _ = sender.send(Err(RuntimeError::Io(e))).await;
                            return;
                        }
                    }
                }
            }

            let stderr_text = stderr_task.await.unwrap_or_default();
            let outcome = match child.wait().await {
                Ok(status) if status.success() => return,
                Ok(status) => RuntimeError::CommandFailed {
                    command,
                    code: status.code(),
                    stderr: stderr_text.trim().to_string(),
                },
                Err(e) => RuntimeError::Io(e),
            };
            let _ = sender.send(Err(outcome)).await;
        });

        Ok(stream)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
        info!("Creating container {} from image {}", spec.name, spec.image);

        let id = self.run(&create_args(spec)).await?;
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone());

        debug!("Container {} created with ID {}", spec.name, id);
        Ok(ContainerHandle {
            id,
            name: spec.name.clone(),
        })
    }

    async fn start(&self, handle: &ContainerHandle) -> Result<AttachedOutput, RuntimeError> {
        let args = vec![
            "start".to_string(),
            "--attach".to_string(),
            handle.id.clone(),
        ];
        let command = self.command_line(&args);
        debug!("Running {}", command);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RuntimeError::Spawn { command, source })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(RuntimeError::Io(std::io::Error::other(
                "attached process has no output pipes",
            )));
        };

        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id.clone(), child);

        Ok(AttachedOutput {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        })
    }

    async fn wait(&self, handle: &ContainerHandle) -> Result<ExitStatus, RuntimeError> {
        let child = self
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id);

        let mut child = child.ok_or_else(|| RuntimeError::UnknownContainer(handle.id.clone()))?;
        let status = child.wait().await?;

        debug!("Container {} exited: {:?}", handle.name, status.code());
        Ok(ExitStatus {
            code: status.code(),
        })
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        self.run(&["rm".to_string(), "-f".to_string(), handle.id.clone()])
            .await?;
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id);

        debug!("Container {} removed", handle.name);
        Ok(())
    }
}

impl Drop for CliRuntime {
    fn drop(&mut self) {
        let created = self
            .created
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        for id in created.drain() {
            debug!("Removing leftover container {}", id);
            match std::process::Command::new(&self.binary)
                .args(["rm", "-f", id.as_str()])
                .output()
            {
                Ok(output) if output.status.success() => {}
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!("Failed to remove container {}: {}", id, stderr.trim());
                }
                Err(e) => warn!("Failed to remove container {}: {}", id, e),
            }
        }
    }
}
