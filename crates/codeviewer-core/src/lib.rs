//! Codeviewer Core — project registry, relation index, artifact and snippet
//! caches, and the materialization orchestrator

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod snippets;


#[cfg(test)]
pub mod test_utils;

pub use analyzer::{quote_struct, unquote_struct, Analyzer, AnalyzerFactory};
pub use cache::{probe, read_text, sanitize, Artifact, ArtifactKey, ArtifactLayout, RESOURCE_DIR};
pub use config::Config;
pub use error::ViewerError;
pub use index::{IndexPolicy, RelationIndex};
pub use model::{
    DiagramKind, DisplayText, DrawRequest, DrawResponse, DrawStatus, Granularity, ProjectId, ProjectRelations,
    Relation, Snippets, DIAGRAM_DEPTH,
};
pub use orchestrator::Materializer;
pub use registry::{project_id, Project, ProjectRegistry};
pub use snippets::{SnippetCache, SnippetKey, SnippetKind, SnippetStats};
