//! Environment assembly
//!
//! Normalizes a job's declared variables into ordered `KEY=VALUE` entries.

use std::collections::HashSet;

use crate::domain::job::VariableSource;

/// Assemble the `KEY=VALUE` entries a job declares itself
///
/// Mapping entries keep document order, lists are returned unchanged, and
/// an absent or unsupported `variables` field yields no entries.
pub fn assemble_env(variables: &VariableSource) -> Vec<String> {
    match variables {
        VariableSource::Absent | VariableSource::Unsupported => Vec::new(),
        VariableSource::Mapping(pairs) => pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect(),
        VariableSource::List(entries) => entries.clone(),
    }
}

/// Key part of a `KEY=VALUE` entry; an entry without `=` is all key
pub fn entry_key(entry: &str) -> &str {
    entry.split_once('=').map_or(entry, |(key, _)| key)
}

/// Drop later entries whose key was already seen, keeping the first
///
/// Resolved jobs list their own variables before inherited ones, so the
/// first occurrence is the most specific declaration.
pub fn dedup_first_wins(entries: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(entries.len());

    for entry in entries {
        if seen.insert(entry_key(entry)) {
            unique.push(entry.clone());
        }
    }

    unique
}
