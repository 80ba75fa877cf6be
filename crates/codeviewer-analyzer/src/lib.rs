//! Codeviewer Analyzer — Go source indexing with tree-sitter, call and
//! struct graphs on petgraph, and diagram rendering through Graphviz

pub mod analyzer;
pub mod index;
pub mod parser;
pub mod render;


pub use analyzer::{GoAnalyzer, GoAnalyzerFactory};
pub use index::{CodeIndex, FREE_FUNCTIONS};
pub use parser::{CallRef, FileUnit, FunctionDef, GoParser, StructDef};
pub use render::{dot_available, render, Diagram};
