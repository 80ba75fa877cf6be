//! Test utilities: a call-counting analyzer that writes real artifact files

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::analyzer::{unquote_struct, Analyzer, AnalyzerFactory};
use crate::cache::{sanitize, ArtifactLayout};
use crate::model::{DiagramKind, Relation, Snippets};
use crate::orchestrator::Materializer;
use crate::registry::ProjectRegistry;

/// Per-operation invocation counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub draw_function: AtomicUsize,
    pub draw_callee: AtomicUsize,
    pub draw_caller: AtomicUsize,
    pub draw_struct: AtomicUsize,
    pub callee_snippets: AtomicUsize,
    pub caller_snippets: AtomicUsize,
    pub struct_snippets: AtomicUsize,
    pub relation: AtomicUsize,
}

impl CallCounts {
    pub fn draws(&self) -> usize {
        self.draw_function.load(Ordering::SeqCst)
            + self.draw_callee.load(Ordering::SeqCst)
            + self.draw_caller.load(Ordering::SeqCst)
            + self.draw_struct.load(Ordering::SeqCst)
    }
}

pub struct StubAnalyzer {
    pub project_path: PathBuf,
    pub output_dir: PathBuf,
    pub calls: CallCounts,
    /// Names received by drawing calls, in order.
    pub drawn: Mutex<Vec<String>>,
    relation: Mutex<Relation>,
    delay: Option<Duration>,
}

impl StubAnalyzer {
    pub fn new(project_path: &Path, output_dir: &Path) -> Self {
        StubAnalyzer {
            project_path: project_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            calls: CallCounts::default(),
            drawn: Mutex::new(Vec::new()),
            relation: Mutex::new(sample_relation("main")),
            delay: None,
        }
    }

    /// Sleep inside every drawing call to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_relation(&self, relation: Relation) {
        *self.relation.lock().unwrap() = relation;
    }

    pub fn drawn(&self) -> Vec<String> {
        self.drawn.lock().unwrap().clone()
    }

    async fn write_artifact(&self, kind: DiagramKind, name: &str) -> anyhow::Result<()> {
        self.drawn.lock().unwrap().push(name.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let stem = format!("{}_{}", kind.prefix(), sanitize(unquote_struct(name)));
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(self.output_dir.join(format!("{}.png", stem)), b"\x89PNG").await?;
        tokio::fs::write(
            self.output_dir.join(format!("{}.txt", stem)),
            format!("{} diagram of {}", kind.prefix(), name),
        )
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Analyzer for StubAnalyzer {
    fn relation(&self) -> Relation {
        self.calls.relation.fetch_add(1, Ordering::SeqCst);
        self.relation.lock().unwrap().clone()
    }

    async fn draw_function(&self, name: &str, _depth: usize) -> anyhow::Result<()> {
        self.calls.draw_function.fetch_add(1, Ordering::SeqCst);
        self.write_artifact(DiagramKind::Function, name).await
    }

    async fn draw_callee_function(&self, name: &str, _depth: usize) -> anyhow::Result<()> {
        self.calls.draw_callee.fetch_add(1, Ordering::SeqCst);
        self.write_artifact(DiagramKind::FunctionCallee, name).await
    }

    async fn draw_caller_function(&self, name: &str, _depth: usize) -> anyhow::Result<()> {
        self.calls.draw_caller.fetch_add(1, Ordering::SeqCst);
        self.write_artifact(DiagramKind::FunctionCaller, name).await
    }

    async fn draw_struct(&self, quoted_name: &str, _depth: usize) -> anyhow::Result<()> {
        self.calls.draw_struct.fetch_add(1, Ordering::SeqCst);
        self.write_artifact(DiagramKind::Struct, quoted_name).await
    }

    fn function_callee_snippets(&self, name: &str) -> Snippets {
        self.calls.callee_snippets.fetch_add(1, Ordering::SeqCst);
        snippet("callee.go:1-3", &format!("callee of {}", name))
    }

    fn function_caller_snippets(&self, name: &str) -> Snippets {
        self.calls.caller_snippets.fetch_add(1, Ordering::SeqCst);
        snippet("caller.go:4-9", &format!("caller of {}", name))
    }

    fn struct_snippets(&self, quoted_name: &str) -> Snippets {
        self.calls.struct_snippets.fetch_add(1, Ordering::SeqCst);
        snippet("types.go:10-14", &format!("type {} struct {{}}", quoted_name))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn snippet(label: &str, text: &str) -> Snippets {
    let mut snippets = Snippets::new();
    snippets.insert(label.to_string(), text.to_string());
    snippets
}

/// Relation with one module, one struct and a free function.
pub fn sample_relation(module: &str) -> Relation {
    let mut structs = std::collections::BTreeMap::new();
    structs.insert("-".to_string(), vec![format!("{}/main", module)]);
    structs.insert(
        "Server".to_string(),
        vec![format!("{}/Server.Start", module), format!("{}/Server.Stop", module)],
    );
    let mut relation = Relation::new();
    relation.insert(module.to_string(), structs);
    relation
}

/// Factory that hands out [`StubAnalyzer`]s and remembers them.
/// Paths containing `broken` fail to initialise.
#[derive(Default)]
pub struct StubFactory {
    pub created: Mutex<Vec<Arc<StubAnalyzer>>>,
    delay: Option<Duration>,
}

impl StubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        StubFactory {
            created: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    /// Most recently created analyzer for a project path ending in `suffix`.
    pub fn analyzer_for(&self, suffix: &str) -> Arc<StubAnalyzer> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|a| a.project_path.ends_with(suffix))
            .cloned()
            .expect("no analyzer created for that path")
    }
}

impl AnalyzerFactory for StubFactory {
    fn create(&self, project_path: &Path, output_dir: &Path) -> anyhow::Result<Arc<dyn Analyzer>> {
        if project_path.to_string_lossy().contains("broken") {
            anyhow::bail!("cannot parse {}", project_path.display());
        }
        let mut analyzer = StubAnalyzer::new(project_path, output_dir);
        if let Some(delay) = self.delay {
            analyzer = analyzer.with_delay(delay);
        }
        let analyzer = Arc::new(analyzer);
        self.created.lock().unwrap().push(Arc::clone(&analyzer));
        Ok(analyzer)
    }
}

/// A materializer over one registered project `svc` in a temporary resource dir.
pub struct TestEnv {
    pub temp: TempDir,
    pub factory: StubFactory,
    pub registry: Arc<ProjectRegistry>,
    pub layout: ArtifactLayout,
}

impl TestEnv {
    pub fn new(project_list: &str) -> Self {
        Self::with_factory(project_list, StubFactory::new())
    }

    pub fn with_factory(project_list: &str, factory: StubFactory) -> Self {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp.path().join("resource"));
        let registry = Arc::new(ProjectRegistry::from_list(project_list, &layout, &factory));
        TestEnv {
            temp,
            factory,
            registry,
            layout,
        }
    }

    pub fn materializer(&self) -> Materializer {
        Materializer::new(Arc::clone(&self.registry), self.layout.clone())
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.layout.project_dir(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_writes_artifact_pair() {
        let temp = TempDir::new().unwrap();
        let stub = StubAnalyzer::new(Path::new("/src/svc"), temp.path());
        stub.draw_struct("\"User\"", 10).await.unwrap();

        assert!(temp.path().join("struct_User.png").is_file());
        let text = std::fs::read_to_string(temp.path().join("struct_User.txt")).unwrap();
        assert_eq!(text, "struct diagram of \"User\"");
        assert_eq!(stub.calls.draws(), 1);
    }
}
