//! Disk artifact cache: a diagram image and its companion text file.
//!
//! Presence of the image is a permanent cache hit. Nothing here ever deletes
//! or regenerates an artifact except an explicit [`ArtifactLayout::clear`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ViewerError;
use crate::model::{DiagramKind, ProjectId};
use crate::registry::project_id;

/// Default root of the artifact tree, relative to the working directory.
pub const RESOURCE_DIR: &str = "resource";

pub const IMAGE_EXT: &str = "png";
pub const TEXT_EXT: &str = "txt";

/// Replace path separators so an identifier can be used as a file name.
pub fn sanitize(identifier: &str) -> String {
    identifier.replace(['/', '\\'], "_")
}

/// Identity of one artifact: project, diagram kind and sanitized name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub project: ProjectId,
    pub kind: DiagramKind,
    pub name: String,
}

impl ArtifactKey {
    /// `raw` is sanitized here; callers pass the unmodified identifier.
    pub fn new(project: ProjectId, kind: DiagramKind, raw: &str) -> Self {
        ArtifactKey {
            project,
            kind,
            name: sanitize(raw),
        }
    }

    /// File stem, e.g. `function_callee_pkg_DoWork`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.name)
    }
}

/// Resolved on-disk location of an artifact pair.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub key: ArtifactKey,
    pub image: PathBuf,
    pub text: PathBuf,
}

impl Artifact {
    /// Cache-hit check. Only the image is probed; its content is not validated.
    pub async fn is_materialized(&self) -> bool {
        probe(&self.image).await
    }
}

/// Directory layout of the cache: `<root>/<project>/<kind>_<name>.png|.txt`.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output directory of one project.
    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    /// Ensure the project directory exists
    pub fn ensure_project_dir(&self, project: &str) -> std::io::Result<PathBuf> {
        let dir = self.project_dir(project);
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    pub fn artifact(&self, key: ArtifactKey) -> Artifact {
        let dir = self.project_dir(key.project.as_str());
        let stem = key.file_stem();
        Artifact {
            image: dir.join(format!("{}.{}", stem, IMAGE_EXT)),
            text: dir.join(format!("{}.{}", stem, TEXT_EXT)),
            key,
        }
    }

    /// Remove cached artifacts of one project, or of every project. Plain
    /// files directly under the root (such as a project list) are kept.
    pub fn clear(&self, project: Option<&str>) -> std::io::Result<()> {
        if let Some(project) = project {
            // a single normal path component, never the root or a path outside it
            if project_id(Path::new(project)).as_ref().map(ProjectId::as_str) != Some(project) {
                return Err(std::io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("invalid project name {:?}", project),
                ));
            }
            let dir = self.project_dir(project);
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
            return Ok(());
        }
        if !self.root.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            }
        }
        Ok(())
    }
}

/// Existence check. Any I/O failure other than "not found" is logged and
/// reported as absent, which makes the caller regenerate.
pub async fn probe(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file(),
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(source) => {
            let err = ViewerError::ArtifactIo {
                path: path.to_path_buf(),
                source,
            };
            tracing::warn!("{}; treating as cache miss", err);
            false
        }
    }
}

/// Read a companion text file. Failures yield an empty string.
pub async fn read_text(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(source) => {
            let err = ViewerError::ArtifactIo {
                path: path.to_path_buf(),
                source,
            };
            tracing::warn!("{}; display text left empty", err);
            String::new()
        }
    }
}
