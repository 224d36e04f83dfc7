//! Pipeline domain types

use super::job::JobDefinition;

/// A top-level entry of a pipeline document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEntry {
    /// A mapping body, validated as a job
    Job(JobDefinition),
    /// Any non-mapping body (`stages:` lists, scalars)
    Other,
}

/// Parsed pipeline: job name to definition, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    entries: Vec<(String, PipelineEntry)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing any previous entry with the same name in place
    pub fn insert(&mut self, name: impl Into<String>, entry: PipelineEntry) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((name, entry)),
        }
    }

    /// Looks up an entry by name
    pub fn get(&self, name: &str) -> Option<&PipelineEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Names of all job entries, in document order
    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            PipelineEntry::Job(_) => Some(name.as_str()),
            PipelineEntry::Other => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_names_keep_order_and_skip_other() {
        let mut pipeline = Pipeline::new();
        pipeline.insert("test", PipelineEntry::Job(JobDefinition::default()));
        pipeline.insert("stages", PipelineEntry::Other);
        pipeline.insert("build", PipelineEntry::Job(JobDefinition::default()));

        let names: Vec<_> = pipeline.job_names().collect();
        assert_eq!(names, vec!["test", "build"]);
        assert_eq!(pipeline.len(), 3);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut pipeline = Pipeline::new();
        pipeline.insert("a", PipelineEntry::Other);
        pipeline.insert("b", PipelineEntry::Other);
        pipeline.insert("a", PipelineEntry::Job(JobDefinition::default()));

        let names: Vec<_> = pipeline.job_names().collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(pipeline.len(), 2);
        assert!(pipeline.get("missing").is_none());
    }
}
