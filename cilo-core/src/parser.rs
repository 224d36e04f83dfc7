//! Pipeline document parser
//!
//! Turns a YAML pipeline document into a typed [`Pipeline`]. Every job
//! body is validated here, once, so the resolver and the assemblers never
//! have to inspect raw YAML values.
//!
//! Recognised job fields are `image`, `variables`, `extends`,
//! `before_script`, `script` and `after_script`. Anything else a job
//! declares is ignored. Merge keys (`<<: *anchor`) are expanded before any
//! job is read.
//!
//! Top-level pipeline keywords (`default`, `variables`, `workflow`, ...)
//! are never jobs, whatever their body looks like.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::domain::job::{JobDefinition, Phase, ScriptPhase, VariableSource};
use crate::domain::pipeline::{Pipeline, PipelineEntry};
use crate::error::{ConfigError, Result};

/// Top-level keys that configure the pipeline rather than name a job
const GLOBAL_KEYWORDS: [&str; 10] = [
    "after_script",
    "before_script",
    "cache",
    "default",
    "image",
    "include",
    "services",
    "stages",
    "variables",
    "workflow",
];

/// Parse a pipeline document
///
/// # Errors
/// Returns an error if:
/// - The source is not valid YAML
/// - The top level is not a mapping with string keys
/// - A job body declares a recognised field with the wrong shape
///
/// # Example
/// ```
/// use cilo_core::parser::parse_pipeline;
///
/// let source = r#"
/// build:
///   image: alpine
///   script:
///     - echo hi
/// "#;
///
/// let pipeline = parse_pipeline(source)?;
/// assert_eq!(pipeline.job_names().collect::<Vec<_>>(), vec!["build"]);
/// # Ok::<(), cilo_core::ConfigError>(())
/// ```
pub fn parse_pipeline(source: &str) -> Result<Pipeline> {
    if source.trim().is_empty() {
        return Ok(Pipeline::new());
    }

    let mut document: Value = serde_yaml::from_str(source)?;
    document.apply_merge()?;

    let root = match document {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => return Err(ConfigError::NotAMapping),
    };

    let mut pipeline = Pipeline::new();

    for (key, body) in root {
        let name = match key {
            Value::String(name) => name,
            _ => return Err(ConfigError::NotAMapping),
        };

        let entry = match body {
            Value::Mapping(fields) if !GLOBAL_KEYWORDS.contains(&name.as_str()) => {
                PipelineEntry::Job(parse_job(&name, &fields)?)
            }
            _ => {
                debug!("Skipping non-job entry '{}'", name);
                PipelineEntry::Other
            }
        };

        pipeline.insert(name, entry);
    }

    Ok(pipeline)
}

/// Parse a single job body
fn parse_job(name: &str, fields: &Mapping) -> Result<JobDefinition> {
    Ok(JobDefinition {
        image: parse_image(name, fields.get("image"))?,
        variables: parse_variables(name, fields.get("variables"))?,
        extends: parse_extends(name, fields.get("extends"))?,
        before_script: parse_phase(name, Phase::BeforeScript, fields)?,
        script: parse_phase(name, Phase::Script, fields)?,
        after_script: parse_phase(name, Phase::AfterScript, fields)?,
    })
}

/// Parse the 'image' field: a string, or a mapping with a `name` string
fn parse_image(job: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(image)) => Ok(Some(image.clone())),
        Some(Value::Mapping(long_form)) => match long_form.get("name") {
            Some(Value::String(image)) => Ok(Some(image.clone())),
            _ => Err(ConfigError::invalid_field(
                job,
                "image.name",
                "a string",
            )),
        },
        Some(_) => Err(ConfigError::invalid_field(
            job,
            "image",
            "a string or a mapping with 'name'",
        )),
    }
}

/// Parse the 'extends' field
fn parse_extends(job: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(parent)) => Ok(Some(parent.clone())),
        Some(_) => Err(ConfigError::invalid_field(job, "extends", "a job name")),
    }
}

/// Parse the 'variables' field
///
/// Mappings keep their document order. A list is only accepted when all
/// of its entries are strings; other shapes fall back to
/// [`VariableSource::Unsupported`].
fn parse_variables(job: &str, value: Option<&Value>) -> Result<VariableSource> {
    match value {
        None | Some(Value::Null) => Ok(VariableSource::Absent),
        Some(Value::Mapping(mapping)) => {
            let mut pairs = Vec::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = scalar_text(key).ok_or_else(|| {
                    ConfigError::invalid_field(job, "variables", "a mapping with scalar keys")
                })?;
                let value = variable_value(value).ok_or_else(|| {
                    ConfigError::invalid_field(
                        job,
                        format!("variables.{}", key),
                        "a scalar or a mapping with 'value'",
                    )
                })?;
                pairs.push((key, value));
            }
            Ok(VariableSource::Mapping(pairs))
        }
        Some(Value::Sequence(items)) => {
            let entries: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            Ok(entries
                .map(VariableSource::List)
                .unwrap_or(VariableSource::Unsupported))
        }
        Some(_) => Ok(VariableSource::Unsupported),
    }
}

/// Value of a variable mapping entry
fn variable_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Mapping(long_form) => long_form.get("value").and_then(scalar_text),
        other => scalar_text(other),
    }
}

/// Textual form of a YAML scalar
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Parse one of the script phase fields
fn parse_phase(job: &str, phase: Phase, fields: &Mapping) -> Result<Option<ScriptPhase>> {
    match fields.get(phase.key()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(line)) => Ok(Some(ScriptPhase::Line(line.clone()))),
        Some(Value::Sequence(items)) => {
            let mut lines = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(line) => lines.push(line.to_string()),
                    None => {
                        return Err(ConfigError::invalid_field(
                            job,
                            phase.key(),
                            "a string or a list of strings",
                        ));
                    }
                }
            }
            Ok(Some(ScriptPhase::Lines(lines)))
        }
        Some(_) => Err(ConfigError::invalid_field(
            job,
            phase.key(),
            "a string or a list of strings",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job<'a>(pipeline: &'a Pipeline, name: &str) -> &'a JobDefinition {
        match pipeline.get(name) {
            Some(PipelineEntry::Job(job)) => job,
            other => panic!("expected job '{}', got {:?}", name, other),
        }
    }

    #[test]
    fn test_parse_minimal_job() {
        let pipeline = parse_pipeline("build:\n  image: alpine\n  script: echo hi\n").unwrap();
        let build = job(&pipeline, "build");

        assert_eq!(build.image.as_deref(), Some("alpine"));
        assert_eq!(build.script, Some(ScriptPhase::Line("echo hi".to_string())));
        assert_eq!(build.before_script, None);
        assert_eq!(build.variables, VariableSource::Absent);
        assert_eq!(build.extends, None);
    }

    #[test]
    fn test_parse_full_job() {
        let source = r#"
.base:
  image:
    name: rust:1.80
  variables:
    CARGO_HOME: /cache/cargo
    RETRIES: 3
    VERBOSE: true
    EMPTY:
    DOCUMENTED:
      value: yes-please
      description: ignored
test:
  extends: .base
  stage: test
  before_script:
    - rustc --version
  script:
    - cargo test
  after_script: echo done
"#;
        let pipeline = parse_pipeline(source).unwrap();

        let base = job(&pipeline, ".base");
        assert_eq!(base.image.as_deref(), Some("rust:1.80"));
        assert_eq!(
            base.variables,
            VariableSource::Mapping(vec![
                ("CARGO_HOME".to_string(), "/cache/cargo".to_string()),
                ("RETRIES".to_string(), "3".to_string()),
                ("VERBOSE".to_string(), "true".to_string()),
                ("EMPTY".to_string(), String::new()),
                ("DOCUMENTED".to_string(), "yes-please".to_string()),
            ])
        );

        let test = job(&pipeline, "test");
        assert_eq!(test.extends.as_deref(), Some(".base"));
        assert_eq!(
            test.before_script,
            Some(ScriptPhase::Lines(vec!["rustc --version".to_string()]))
        );
        assert_eq!(
            test.after_script,
            Some(ScriptPhase::Line("echo done".to_string()))
        );
    }

    #[test]
    fn test_parse_variables_list_and_fallback() {
        let source = r#"
listed:
  variables: ["A=1", "B=2"]
mixed:
  variables: ["A=1", 2]
scalar:
  variables: nope
"#;
        let pipeline = parse_pipeline(source).unwrap();

        assert_eq!(
            job(&pipeline, "listed").variables,
            VariableSource::List(vec!["A=1".to_string(), "B=2".to_string()])
        );
        assert_eq!(job(&pipeline, "mixed").variables, VariableSource::Unsupported);
        assert_eq!(job(&pipeline, "scalar").variables, VariableSource::Unsupported);
    }

    #[test]
    fn test_non_mapping_entries_are_not_jobs() {
        let source = "stages: [build, test]\nbuild:\n  script: make\n";
        let pipeline = parse_pipeline(source).unwrap();

        assert_eq!(pipeline.get("stages"), Some(&PipelineEntry::Other));
        assert_eq!(pipeline.job_names().collect::<Vec<_>>(), vec!["build"]);
    }

    #[test]
    fn test_merge_keys_are_expanded() {
        let source = r#"
.defaults: &defaults
  image: alpine
  before_script: [setup]
build:
  <<: *defaults
  script: [make]
"#;
        let pipeline = parse_pipeline(source).unwrap();
        let build = job(&pipeline, "build");

        assert_eq!(build.image.as_deref(), Some("alpine"));
        assert_eq!(
            build.before_script,
            Some(ScriptPhase::Lines(vec!["setup".to_string()]))
        );
        assert_eq!(
            build.script,
            Some(ScriptPhase::Lines(vec!["make".to_string()]))
        );
    }

    #[test]
    fn test_merged_fields_yield_to_local_ones() {
        let source = r#"
.defaults: &defaults
  image: alpine
  script: [default-main]
build:
  <<: *defaults
  image: rust
"#;
        let pipeline = parse_pipeline(source).unwrap();
        let build = job(&pipeline, "build");

        assert_eq!(build.image.as_deref(), Some("rust"));
        assert_eq!(
            build.script,
            Some(ScriptPhase::Lines(vec!["default-main".to_string()]))
        );
    }

    #[test]
    fn test_global_keywords_are_not_jobs() {
        let source = r#"
default:
  image: alpine
variables:
  GLOBAL: "1"
workflow:
  rules: []
build:
  script: [make]
"#;
        let pipeline = parse_pipeline(source).unwrap();

        assert_eq!(pipeline.get("default"), Some(&PipelineEntry::Other));
        assert_eq!(pipeline.get("variables"), Some(&PipelineEntry::Other));
        assert_eq!(pipeline.job_names().collect::<Vec<_>>(), vec!["build"]);
    }

    #[test]
    fn test_document_order_is_preserved() {
        let source = "zeta:\n  script: z\nalpha:\n  script: a\nmid:\n  script: m\n";
        let pipeline = parse_pipeline(source).unwrap();

        assert_eq!(
            pipeline.job_names().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn test_invalid_shapes_are_rejected() {
        let err = parse_pipeline("a:\n  extends: [b, c]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "extends"));

        let err = parse_pipeline("a:\n  script: {run: x}\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "script"));

        let err = parse_pipeline("a:\n  script: [ok, [nested]]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));

        let err = parse_pipeline("a:\n  image: 42\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "image"));
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        assert!(matches!(
            parse_pipeline("- a\n- b\n"),
            Err(ConfigError::NotAMapping)
        ));
        assert!(matches!(parse_pipeline("a: [\n"), Err(ConfigError::Parse(_))));
        assert!(parse_pipeline("").unwrap().is_empty());
    }
}
