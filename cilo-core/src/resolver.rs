//! Job configuration resolver
//!
//! Produces a fully merged [`ResolvedJob`] by walking a job's `extends`
//! chain. The parent is resolved first, then merged into the child:
//!
//! - a non-empty parent image replaces the child's image, even one the
//!   child declared itself
//! - the parent's resolved variables are appended after the child's own
//! - each script phase the child does not declare is copied from the
//!   parent wholesale; phases are never concatenated
//!
//! The pipeline itself is never modified.

use tracing::debug;

use crate::domain::job::{JobDefinition, Phase, ResolvedJob};
use crate::domain::pipeline::{Pipeline, PipelineEntry};
use crate::env::assemble_env;
use crate::error::{ConfigError, Result};

/// Resolve a job by name
///
/// # Errors
/// Returns an error if:
/// - `name` (or any job in its chain) is not in the pipeline
/// - an entry in the chain is not a job mapping
/// - the chain loops back on itself
///
/// # Example
/// ```
/// use cilo_core::{parse_pipeline, resolve};
///
/// let pipeline = parse_pipeline(r#"
/// .base:
///   image: alpine
///   before_script: [apk add make]
/// build:
///   extends: .base
///   script: [make]
/// "#)?;
///
/// let job = resolve(&pipeline, "build")?;
/// assert_eq!(job.image.as_deref(), Some("alpine"));
/// assert!(job.before_script.is_some());
/// # Ok::<(), cilo_core::ConfigError>(())
/// ```
pub fn resolve(pipeline: &Pipeline, name: &str) -> Result<ResolvedJob> {
    let mut chain = Vec::new();
    resolve_chain(pipeline, name, &mut chain)
}

fn resolve_chain(pipeline: &Pipeline, name: &str, chain: &mut Vec<String>) -> Result<ResolvedJob> {
    let definition = lookup(pipeline, name, chain.last())?;

    if chain.iter().any(|seen| seen == name) {
        let mut cycle = chain.clone();
        cycle.push(name.to_string());
        return Err(ConfigError::CyclicExtends { chain: cycle });
    }
    chain.push(name.to_string());

    let mut resolved = ResolvedJob {
        name: name.to_string(),
        image: definition.image.clone(),
        variables: assemble_env(&definition.variables),
        before_script: definition.before_script.clone(),
        script: definition.script.clone(),
        after_script: definition.after_script.clone(),
    };

    let Some(parent_name) = definition.extends.as_deref() else {
        chain.pop();
        return Ok(resolved);
    };

    debug!("Job '{}' extends '{}'", name, parent_name);
    let parent = resolve_chain(pipeline, parent_name, chain)?;

    for phase in Phase::ALL {
        let slot = resolved.phase_mut(phase);
        if slot.is_none() {
            *slot = parent.phase(phase).cloned();
        }
    }

    if let Some(image) = parent.image.filter(|image| !image.is_empty()) {
        resolved.image = Some(image);
    }

    resolved.variables.extend(parent.variables);

    chain.pop();
    Ok(resolved)
}

/// Find a job definition, reporting who referenced it when it is missing
fn lookup<'a>(
    pipeline: &'a Pipeline,
    name: &str,
    referenced_by: Option<&String>,
) -> Result<&'a JobDefinition> {
    match pipeline.get(name) {
        Some(PipelineEntry::Job(definition)) => Ok(definition),
        Some(PipelineEntry::Other) => Err(ConfigError::NotAJob(name.to_string())),
        None => Err(match referenced_by {
            Some(child) => ConfigError::UnknownParent {
                job: child.clone(),
                parent: name.to_string(),
            },
            None => ConfigError::JobNotFound(name.to_string()),
        }),
    }
}
