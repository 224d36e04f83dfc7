//! Job domain types

use serde::Serialize;

/// One of the three script stages of a job, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BeforeScript,
    Script,
    AfterScript,
}

impl Phase {
    /// All phases in the order they are concatenated into the script body
    pub const ALL: [Phase; 3] = [Phase::BeforeScript, Phase::Script, Phase::AfterScript];

    /// The field name used in pipeline documents
    pub fn key(self) -> &'static str {
        match self {
            Phase::BeforeScript => "before_script",
            Phase::Script => "script",
            Phase::AfterScript => "after_script",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A script phase as written in the pipeline: a single string or a list of lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScriptPhase {
    Line(String),
    Lines(Vec<String>),
}

impl ScriptPhase {
    /// Returns true if the phase contributes nothing to the script
    pub fn is_empty(&self) -> bool {
        match self {
            ScriptPhase::Line(line) => line.is_empty(),
            ScriptPhase::Lines(lines) => lines.is_empty(),
        }
    }

    /// Lines this phase contributes to the script body
    ///
    /// A single string is used verbatim; list entries are trimmed.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            ScriptPhase::Line(line) => vec![line.as_str()],
            ScriptPhase::Lines(lines) => lines.iter().map(|line| line.trim()).collect(),
        }
    }
}

/// The `variables` field of a job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VariableSource {
    /// No `variables` field
    #[default]
    Absent,
    /// `KEY: value` pairs in document order
    Mapping(Vec<(String, String)>),
    /// Ready-made `KEY=VALUE` entries
    List(Vec<String>),
    /// Any other shape; contributes no entries
    Unsupported,
}

/// A job body as declared in the pipeline, before inheritance is applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDefinition {
    pub image: Option<String>,
    pub variables: VariableSource,
    pub extends: Option<String>,
    pub before_script: Option<ScriptPhase>,
    pub script: Option<ScriptPhase>,
    pub after_script: Option<ScriptPhase>,
}

impl JobDefinition {
    /// Returns the declared value of a script phase
    pub fn phase(&self, phase: Phase) -> Option<&ScriptPhase> {
        match phase {
            Phase::BeforeScript => self.before_script.as_ref(),
            Phase::Script => self.script.as_ref(),
            Phase::AfterScript => self.after_script.as_ref(),
        }
    }
}

/// A job after its `extends` chain has been merged
///
/// There is no inheritance pointer left on a resolved job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedJob {
    pub name: String,
    pub image: Option<String>,
    pub variables: Vec<String>,
    pub before_script: Option<ScriptPhase>,
    pub script: Option<ScriptPhase>,
    pub after_script: Option<ScriptPhase>,
}

impl ResolvedJob {
    /// Returns the resolved value of a script phase
    pub fn phase(&self, phase: Phase) -> Option<&ScriptPhase> {
        match phase {
            Phase::BeforeScript => self.before_script.as_ref(),
            Phase::Script => self.script.as_ref(),
            Phase::AfterScript => self.after_script.as_ref(),
        }
    }

    pub(crate) fn phase_mut(&mut self, phase: Phase) -> &mut Option<ScriptPhase> {
        match phase {
            Phase::BeforeScript => &mut self.before_script,
            Phase::Script => &mut self.script,
            Phase::AfterScript => &mut self.after_script,
        }
    }

    /// Returns the image to run, failing if the chain never set one
    pub fn require_image(&self) -> Result<&str, crate::ConfigError> {
        match self.image.as_deref() {
            Some(image) if !image.is_empty() => Ok(image),
            _ => Err(crate::ConfigError::MissingImage {
                job: self.name.clone(),
            }),
        }
    }
}
