//! In-process snippet caches. Entries live for the whole process.

use std::collections::HashMap;

use crate::model::{ProjectId, Snippets};

/// Which of the three snippet maps a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnippetKind {
    Callee,
    Caller,
    Struct,
}

/// Key for cache lookups: the raw identifier as the analyzer received it.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SnippetKey {
    pub project: ProjectId,
    pub identifier: String,
}

impl SnippetKey {
    pub fn new(project: ProjectId, identifier: &str) -> Self {
        SnippetKey {
            project,
            identifier: identifier.to_string(),
        }
    }
}

/// Three independent maps. Not synchronised itself; the orchestrator keeps
/// it behind the same lock that serialises drawing calls.
#[derive(Debug, Default)]
pub struct SnippetCache {
    callee: HashMap<SnippetKey, Snippets>,
    caller: HashMap<SnippetKey, Snippets>,
    structs: HashMap<SnippetKey, Snippets>,
}

impl SnippetCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_mut(&mut self, kind: SnippetKind) -> &mut HashMap<SnippetKey, Snippets> {
        match kind {
            SnippetKind::Callee => &mut self.callee,
            SnippetKind::Caller => &mut self.caller,
            SnippetKind::Struct => &mut self.structs,
        }
    }

    /// Return the cached snippets for `key`, computing and storing them on a miss.
    pub fn get_or_compute<F>(&mut self, kind: SnippetKind, key: SnippetKey, compute: F) -> Snippets
    where
        F: FnOnce() -> Snippets,
    {
        let map = self.map_mut(kind);
        if let Some(hit) = map.get(&key) {
            tracing::debug!("snippet cache hit ({:?}) {}", kind, key.identifier);
            return hit.clone();
        }
        tracing::debug!("snippet cache miss ({:?}) {}", kind, key.identifier);
        let snippets = compute();
        map.insert(key, snippets.clone());
        snippets
    }

    pub fn get(&self, kind: SnippetKind, key: &SnippetKey) -> Option<&Snippets> {
        match kind {
            SnippetKind::Callee => self.callee.get(key),
            SnippetKind::Caller => self.caller.get(key),
            SnippetKind::Struct => self.structs.get(key),
        }
    }

    pub fn stats(&self) -> SnippetStats {
        SnippetStats {
            callee_entries: self.callee.len(),
            caller_entries: self.caller.len(),
            struct_entries: self.structs.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnippetStats {
    pub callee_entries: usize,
    pub caller_entries: usize,
    pub struct_entries: usize,
}
