//! In-memory runtime for tests
//!
//! Replays scripted pull events and canned container output, and records
//! every call so tests can assert on what the executor asked for.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{
    AttachedOutput, ContainerHandle, ContainerRuntime, ContainerSpec, ExitStatus, ProgressEvent,
    ProgressStream,
};
use crate::error::RuntimeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Pull(String),
    Create(String),
    Start(String),
    Wait(String),
    Remove(String),
}

pub struct FakeRuntime {
    pub pull_events: Vec<ProgressEvent>,
    pub pull_error: Option<String>,
    pub fail_create: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,

    pub calls: Mutex<Vec<Call>>,
    pub specs: Mutex<Vec<ContainerSpec>>,
    /// Content of the script file at creation time
    pub scripts: Mutex<Vec<String>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            pull_events: Vec::new(),
            pull_error: None,
            fail_create: false,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: Some(0),
            calls: Mutex::new(Vec::new()),
            specs: Mutex::new(Vec::new()),
            scripts: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRuntime {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn version(&self) -> Result<String, RuntimeError> {
        Ok("fake 1.0".to_string())
    }

    async fn pull_image(&self, reference: &str) -> Result<ProgressStream, RuntimeError> {
        self.record(Call::Pull(reference.to_string()));

        let mut items: Vec<_> = self.pull_events.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.pull_error {
            items.push(Err(RuntimeError::Registry(message.clone())));
        }
        Ok(ProgressStream::from_items(items))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
        self.record(Call::Create(spec.name.clone()));
        if self.fail_create {
            return Err(RuntimeError::CommandFailed {
                command: "fake create".to_string(),
                code: Some(125),
                stderr: "invalid mount".to_string(),
            });
        }

        if let Some(script) = spec.mounts.iter().find(|m| m.read_only) {
            let body = std::fs::read_to_string(&script.source).unwrap_or_default();
            self.scripts.lock().unwrap().push(body);
        }
        self.specs.lock().unwrap().push(spec.clone());

        Ok(ContainerHandle {
            id: format!("id-{}", spec.name),
            name: spec.name.clone(),
        })
    }

    async fn start(&self, handle: &ContainerHandle) -> Result<AttachedOutput, RuntimeError> {
        self.record(Call::Start(handle.id.clone()));
        Ok(AttachedOutput {
            stdout: Box::new(std::io::Cursor::new(self.stdout.clone())),
            stderr: Box::new(std::io::Cursor::new(self.stderr.clone())),
        })
    }

    async fn wait(&self, handle: &ContainerHandle) -> Result<ExitStatus, RuntimeError> {
        self.record(Call::Wait(handle.id.clone()));
        Ok(ExitStatus {
            code: self.exit_code,
        })
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        self.record(Call::Remove(handle.id.clone()));
        Ok(())
    }
}
