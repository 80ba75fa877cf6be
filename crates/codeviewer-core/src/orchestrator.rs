//! Materialization orchestrator: resolves a draw request against the disk
//! artifact cache and the snippet cache, generating what is missing.
//!
//! One process-wide lock serialises every drawing call and every snippet
//! cache access. Unrelated projects and functions therefore queue behind
//! each other; that is the throughput ceiling of this layer.
//!
//! The image probe happens first without the lock as a fast path. On a miss
//! the probe is repeated under the lock, so concurrent identical requests
//! collapse into a single drawing call.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::analyzer::{quote_struct, Analyzer};
use crate::cache::{self, Artifact, ArtifactKey, ArtifactLayout};
use crate::error::ViewerError;
use crate::model::{
    DiagramKind, DisplayText, DrawRequest, DrawResponse, DrawStatus, Granularity, ProjectId, Snippets,
    DIAGRAM_DEPTH,
};
use crate::registry::ProjectRegistry;
use crate::snippets::{SnippetCache, SnippetKey, SnippetKind, SnippetStats};

pub struct Materializer {
    registry: Arc<ProjectRegistry>,
    layout: ArtifactLayout,
    granularity: Granularity,
    display: DisplayText,
    /// The global lock. Guards the snippet maps and every drawing call.
    snippets: Mutex<SnippetCache>,
}

impl Materializer {
    pub fn new(registry: Arc<ProjectRegistry>, layout: ArtifactLayout) -> Self {
        Materializer {
            registry,
            layout,
            granularity: Granularity::default(),
            display: DisplayText::default(),
            snippets: Mutex::new(SnippetCache::new()),
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_display_text(mut self, display: DisplayText) -> Self {
        self.display = display;
        self
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub async fn snippet_stats(&self) -> SnippetStats {
        self.snippets.lock().await.stats()
    }

    /// Handle one draw request. Unknown projects get an in-band soft failure
    /// without touching the filesystem or the caches.
    pub async fn draw(&self, request: &DrawRequest) -> DrawResponse {
        let Some(analyzer) = self.registry.analyzer(&request.project) else {
            debug!("{}", ViewerError::UnknownProject(request.project.clone()));
            return DrawResponse::fail();
        };
        let project = ProjectId::from(request.project.as_str());

        if request.is_function_type {
            self.draw_function(project, analyzer.as_ref(), &request.selected_function)
                .await
        } else {
            self.draw_struct(project, analyzer.as_ref(), &request.selected_struct)
                .await
        }
    }

    async fn draw_function(&self, project: ProjectId, analyzer: &dyn Analyzer, function: &str) -> DrawResponse {
        let kinds: &[DiagramKind] = match self.granularity {
            Granularity::Fine => &[DiagramKind::FunctionCallee, DiagramKind::FunctionCaller],
            Granularity::Coarse => &[DiagramKind::Function],
        };

        let mut texts = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let artifact = self
                .layout
                .artifact(ArtifactKey::new(project.clone(), kind, function));
            self.get_or_materialize(&artifact, analyzer, function).await;
            texts.push(artifact.text);
        }

        let (callee, caller) = {
            let mut cache = self.snippets.lock().await;
            let key = SnippetKey::new(project, function);
            let callee = cache.get_or_compute(SnippetKind::Callee, key.clone(), || {
                analyzer.function_callee_snippets(function)
            });
            let caller = cache.get_or_compute(SnippetKind::Caller, key, || {
                analyzer.function_caller_snippets(function)
            });
            (callee, caller)
        };

        DrawResponse {
            status: DrawStatus::Success,
            display_text: self.display_text(&texts).await,
            callee_code_snippet: callee,
            caller_code_snippet: caller,
            struct_code_snippet: Snippets::new(),
        }
    }

    async fn draw_struct(&self, project: ProjectId, analyzer: &dyn Analyzer, name: &str) -> DrawResponse {
        let artifact = self
            .layout
            .artifact(ArtifactKey::new(project.clone(), DiagramKind::Struct, name));
        self.get_or_materialize(&artifact, analyzer, name).await;

        let quoted = quote_struct(name);
        let snippets = {
            let mut cache = self.snippets.lock().await;
            cache.get_or_compute(SnippetKind::Struct, SnippetKey::new(project, &quoted), || {
                analyzer.struct_snippets(&quoted)
            })
        };

        DrawResponse {
            status: DrawStatus::Success,
            display_text: cache::read_text(&artifact.text).await,
            callee_code_snippet: Snippets::new(),
            caller_code_snippet: Snippets::new(),
            struct_code_snippet: snippets,
        }
    }

    /// Ensure `artifact` exists on disk, drawing it at most once.
    ///
    /// Returns true when this call invoked the analyzer. A failed drawing
    /// call is logged and absorbed; the next request will try again.
    pub async fn get_or_materialize(&self, artifact: &Artifact, analyzer: &dyn Analyzer, raw: &str) -> bool {
        if artifact.is_materialized().await {
            debug!("artifact hit: {}", artifact.image.display());
            return false;
        }

        let _guard = self.snippets.lock().await;
        if artifact.is_materialized().await {
            debug!("artifact materialized while waiting: {}", artifact.image.display());
            return false;
        }

        info!(
            "materializing {} with {}",
            artifact.image.display(),
            analyzer.name()
        );
        let result = match artifact.key.kind {
            DiagramKind::Function => analyzer.draw_function(raw, DIAGRAM_DEPTH).await,
            DiagramKind::FunctionCallee => analyzer.draw_callee_function(raw, DIAGRAM_DEPTH).await,
            DiagramKind::FunctionCaller => analyzer.draw_caller_function(raw, DIAGRAM_DEPTH).await,
            DiagramKind::Struct => analyzer.draw_struct(&quote_struct(raw), DIAGRAM_DEPTH).await,
        };

        if let Err(e) = result {
            let err = ViewerError::Generation {
                kind: artifact.key.kind.prefix(),
                name: raw.to_string(),
                message: format!("{:#}", e),
            };
            error!("{}", err);
        }
        true
    }

    async fn display_text(&self, texts: &[PathBuf]) -> String {
        match self.display {
            DisplayText::Last => match texts.last() {
                Some(path) => cache::read_text(path).await,
                None => String::new(),
            },
            DisplayText::Combined => {
                let mut parts = Vec::with_capacity(texts.len());
                for path in texts {
                    parts.push(cache::read_text(path).await);
                }
                parts.join("\n")
            }
        }
    }
}
