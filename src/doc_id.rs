use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// A stable document identifier derived from the project name a document
/// was projected from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    /// Full 64-bit hash of the project name.
    pub numeric: u64,
    /// Short hex string for human display (e.g. "a1b2c3").
    pub short: String,
}

impl DocumentId {
    pub fn new(project_name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        project_name.hash(&mut hasher);
        let numeric = hasher.finish();
        Self {
            numeric,
            short: format!("{numeric:016x}")[..6].to_string(),
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.short)
    }
}
