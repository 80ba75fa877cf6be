//! Contract of the per-project analysis collaborator

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::model::{Relation, Snippets};

/// Source analysis, diagram rendering and snippet extraction for one project.
///
/// Drawing calls are side-effecting: each writes an image and a companion
/// text file into the output directory the analyzer was created with, named
/// after [`crate::cache::sanitize`] of the identifier. Struct identifiers
/// arrive wrapped in literal double quotes.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Module → struct → function containment of the project.
    fn relation(&self) -> Relation;

    /// Combined callee + caller diagram (`function_<name>`).
    async fn draw_function(&self, name: &str, depth: usize) -> Result<()>;

    /// Diagram of what `name` calls (`function_callee_<name>`).
    async fn draw_callee_function(&self, name: &str, depth: usize) -> Result<()>;

    /// Diagram of what calls `name` (`function_caller_<name>`).
    async fn draw_caller_function(&self, name: &str, depth: usize) -> Result<()>;

    /// Struct relationship diagram (`struct_<name>`); `quoted_name` is `"Name"`.
    async fn draw_struct(&self, quoted_name: &str, depth: usize) -> Result<()>;

    fn function_callee_snippets(&self, name: &str) -> Snippets;

    fn function_caller_snippets(&self, name: &str) -> Snippets;

    fn struct_snippets(&self, quoted_name: &str) -> Snippets;

    /// Analyzer name for logging
    fn name(&self) -> &str;
}

/// Builds one [`Analyzer`] per registered project path.
pub trait AnalyzerFactory: Send + Sync {
    /// `output_dir` is where the analyzer's drawing calls must write artifacts.
    fn create(&self, project_path: &Path, output_dir: &Path) -> Result<Arc<dyn Analyzer>>;
}

/// Wrap a struct identifier in the quote delimiters analyzers expect.
pub fn quote_struct(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Inverse of [`quote_struct`]; leaves unquoted names untouched.
pub fn unquote_struct(name: &str) -> &str {
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
}
