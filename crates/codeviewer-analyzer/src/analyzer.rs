//! Go implementation of the [`Analyzer`] capability set

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use codeviewer_core::{sanitize, unquote_struct, Analyzer, AnalyzerFactory, DiagramKind, Relation, Snippets};
use petgraph::Direction;
use tracing::info;

use crate::index::{CodeIndex, Edge};
use crate::parser::{FunctionDef, StructDef};
use crate::render::{render, Diagram};

/// Analyzer over one Go project. The index is built once at construction.
#[derive(Debug)]
pub struct GoAnalyzer {
    root: PathBuf,
    output_dir: PathBuf,
    index: CodeIndex,
}

impl GoAnalyzer {
    pub fn new(root: &Path, output_dir: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("project path {} is not a directory", root.display());
        }
        let index = CodeIndex::build(root)?;
        info!(
            "Indexed {}: {} functions, {} structs",
            root.display(),
            index.functions().len(),
            index.structs().len()
        );
        Ok(GoAnalyzer {
            root: root.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &CodeIndex {
        &self.index
    }

    fn function_roots(&self, name: &str) -> Result<Vec<usize>> {
        let roots = self.index.find_functions(name);
        if roots.is_empty() {
            bail!("unknown function {}", name);
        }
        Ok(roots)
    }

    fn root_ids(&self, roots: &[usize]) -> Vec<String> {
        roots.iter().map(|&i| self.index.functions()[i].id.clone()).collect()
    }

    async fn draw(&self, kind: DiagramKind, name: &str, diagram: Diagram) -> Result<()> {
        let stem = format!("{}_{}", kind.prefix(), sanitize(name));
        render(&diagram, &self.output_dir, &stem).await?;
        Ok(())
    }

    fn function_snippets(&self, functions: impl IntoIterator<Item = usize>) -> Snippets {
        functions
            .into_iter()
            .map(|i| function_snippet(&self.index.functions()[i]))
            .collect()
    }
}

fn function_snippet(f: &FunctionDef) -> (String, String) {
    (
        format!("{}:{}-{} {}", f.file, f.line_start, f.line_end, f.id),
        f.source.clone(),
    )
}

fn struct_snippet(s: &StructDef) -> (String, String) {
    (
        format!("{}:{}-{} {}", s.file, s.line_start, s.line_end, s.id),
        s.source.clone(),
    )
}

fn merge(mut a: Vec<Edge>, b: Vec<Edge>) -> Vec<Edge> {
    for edge in b {
        if !a.contains(&edge) {
            a.push(edge);
        }
    }
    a
}

#[async_trait]
impl Analyzer for GoAnalyzer {
    fn relation(&self) -> Relation {
        self.index.relation()
    }

    async fn draw_function(&self, name: &str, depth: usize) -> Result<()> {
        let roots = self.function_roots(name)?;
        let edges = merge(
            self.index.call_edges(&roots, Direction::Outgoing, depth),
            self.index.call_edges(&roots, Direction::Incoming, depth),
        );
        let diagram = Diagram::new(
            format!("call graph of {} (depth {})", name, depth),
            self.root_ids(&roots),
            edges,
        );
        self.draw(DiagramKind::Function, name, diagram).await
    }

    async fn draw_callee_function(&self, name: &str, depth: usize) -> Result<()> {
        let roots = self.function_roots(name)?;
        let diagram = Diagram::new(
            format!("callee graph of {} (depth {})", name, depth),
            self.root_ids(&roots),
            self.index.call_edges(&roots, Direction::Outgoing, depth),
        );
        self.draw(DiagramKind::FunctionCallee, name, diagram).await
    }

    async fn draw_caller_function(&self, name: &str, depth: usize) -> Result<()> {
        let roots = self.function_roots(name)?;
        let diagram = Diagram::new(
            format!("caller graph of {} (depth {})", name, depth),
            self.root_ids(&roots),
            self.index.call_edges(&roots, Direction::Incoming, depth),
        );
        self.draw(DiagramKind::FunctionCaller, name, diagram).await
    }

    async fn draw_struct(&self, quoted_name: &str, depth: usize) -> Result<()> {
        let name = unquote_struct(quoted_name);
        let roots = self.index.find_structs(name);
        if roots.is_empty() {
            bail!("unknown struct {}", name);
        }

        let mut edges = self.index.struct_edges(&roots, depth);
        for &s in &roots {
            let owner = &self.index.structs()[s].id;
            for m in self.index.methods_of(s) {
                edges.push((owner.clone(), self.index.functions()[m].id.clone(), Some("method".to_string())));
            }
        }
        let ids = roots.iter().map(|&i| self.index.structs()[i].id.clone()).collect();
        let diagram = Diagram::new(format!("struct graph of {} (depth {})", name, depth), ids, edges);
        self.draw(DiagramKind::Struct, name, diagram).await
    }

    fn function_callee_snippets(&self, name: &str) -> Snippets {
        let roots = self.index.find_functions(name);
        let callees = roots.iter().flat_map(|&r| self.index.neighbors(r, Direction::Outgoing));
        self.function_snippets(roots.iter().copied().chain(callees).collect::<Vec<_>>())
    }

    fn function_caller_snippets(&self, name: &str) -> Snippets {
        let roots = self.index.find_functions(name);
        self.function_snippets(
            roots
                .iter()
                .flat_map(|&r| self.index.neighbors(r, Direction::Incoming))
                .collect::<Vec<_>>(),
        )
    }

    fn struct_snippets(&self, quoted_name: &str) -> Snippets {
        let mut snippets = Snippets::new();
        for s in self.index.find_structs(unquote_struct(quoted_name)) {
            let (label, text) = struct_snippet(&self.index.structs()[s]);
            snippets.insert(label, text);
            snippets.extend(self.function_snippets(self.index.methods_of(s)));
        }
        snippets
    }

    fn name(&self) -> &str {
        "go"
    }
}

/// Creates a [`GoAnalyzer`] per registered project.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoAnalyzerFactory;

impl AnalyzerFactory for GoAnalyzerFactory {
    fn create(&self, project_path: &Path, output_dir: &Path) -> Result<Arc<dyn Analyzer>> {
        Ok(Arc::new(GoAnalyzer::new(project_path, output_dir)?))
    }
}
