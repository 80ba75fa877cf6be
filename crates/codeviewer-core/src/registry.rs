//! Project registry: one analyzer per registered project path.
//!
//! Built once at startup and read-only afterwards, so request handlers share
//! it through an `Arc` without further synchronisation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::analyzer::{Analyzer, AnalyzerFactory};
use crate::cache::ArtifactLayout;
use crate::error::{Result, ViewerError};
use crate::model::ProjectId;

/// A registered project and its analyzer.
#[derive(Clone)]
pub struct Project {
    pub id: ProjectId,
    pub path: PathBuf,
    pub analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

/// Derive the project identifier from a registered path (its basename).
pub fn project_id(path: &Path) -> Option<ProjectId> {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(ProjectId::from)
}

#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<ProjectId, Project>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the newline-delimited project list at `list_path` and build the
    /// registry. Failing to read the list is fatal; failing to initialise a
    /// single project is not.
    pub fn load(list_path: &Path, layout: &ArtifactLayout, factory: &dyn AnalyzerFactory) -> Result<Self> {
        let content = std::fs::read_to_string(list_path).map_err(|source| ViewerError::ConfigLoad {
            path: list_path.to_path_buf(),
            source,
        })?;
        info!("Loading projects from {}", list_path.display());
        Ok(Self::from_list(&content, layout, factory))
    }

    /// Build the registry from the contents of a project list.
    ///
    /// Blank lines and `#` comments are skipped. When two paths share a
    /// basename the later one replaces the earlier one.
    pub fn from_list(content: &str, layout: &ArtifactLayout, factory: &dyn AnalyzerFactory) -> Self {
        let mut registry = Self::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let path = PathBuf::from(line);

            match Self::init_project(&path, layout, factory) {
                Ok(project) => {
                    info!("Registered project {} ({})", project.id, path.display());
                    if let Some(previous) = registry.insert(project) {
                        warn!(
                            "Project {} from {} replaced by {}",
                            previous.id,
                            previous.path.display(),
                            path.display()
                        );
                    }
                }
                Err(e) => warn!("{}; skipping", e),
            }
        }

        info!("{} project(s) registered", registry.len());
        registry
    }

    fn init_project(path: &Path, layout: &ArtifactLayout, factory: &dyn AnalyzerFactory) -> Result<Project> {
        let init_error = |message: String| ViewerError::ProjectInit {
            path: path.to_path_buf(),
            message,
        };

        let id = project_id(path).ok_or_else(|| init_error("path has no basename".to_string()))?;
        let output_dir = layout
            .ensure_project_dir(id.as_str())
            .map_err(|e| init_error(format!("cannot create output dir: {}", e)))?;
        let analyzer = factory
            .create(path, &output_dir)
            .map_err(|e| init_error(format!("{:#}", e)))?;

        Ok(Project {
            id,
            path: path.to_path_buf(),
            analyzer,
        })
    }

    /// Insert a project, returning the one it replaced.
    pub fn insert(&mut self, project: Project) -> Option<Project> {
        self.projects.insert(project.id.clone(), project)
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.get(&ProjectId::from(id))
    }

    pub fn analyzer(&self, id: &str) -> Option<Arc<dyn Analyzer>> {
        self.get(id).map(|p| Arc::clone(&p.analyzer))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
