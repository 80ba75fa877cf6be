//! Relation index served by `GET /load/`

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::ProjectRelations;
use crate::registry::ProjectRegistry;

/// When relation data is captured from the analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPolicy {
    /// Capture once when the index is built and serve that snapshot.
    #[default]
    Startup,
    /// Ask every analyzer again on each read.
    PerRead,
}

pub struct RelationIndex {
    registry: Arc<ProjectRegistry>,
    policy: IndexPolicy,
    snapshot: Option<Arc<ProjectRelations>>,
}

impl RelationIndex {
    pub fn build(registry: Arc<ProjectRegistry>, policy: IndexPolicy) -> Self {
        let snapshot = match policy {
            IndexPolicy::Startup => Some(Arc::new(collect(&registry))),
            IndexPolicy::PerRead => None,
        };
        RelationIndex {
            registry,
            policy,
            snapshot,
        }
    }

    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// Relation data of every project, keyed by project identifier.
    pub fn relations(&self) -> Arc<ProjectRelations> {
        match &self.snapshot {
            Some(snapshot) => Arc::clone(snapshot),
            None => Arc::new(collect(&self.registry)),
        }
    }
}

fn collect(registry: &ProjectRegistry) -> ProjectRelations {
    registry
        .iter()
        .map(|project| (project.id.0.clone(), project.analyzer.relation()))
        .collect()
}
