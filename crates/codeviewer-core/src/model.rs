//! Core data structures shared by the registry, the caches and the HTTP layer

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed traversal limit passed to every drawing call. Never part of a cache key.
pub const DIAGRAM_DEPTH: usize = 10;

/// Relation data of one project: module → struct → ordered function names.
pub type Relation = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Relation data of every registered project, keyed by project identifier.
pub type ProjectRelations = BTreeMap<String, Relation>;

/// Code excerpts keyed by a code-location label.
pub type Snippets = BTreeMap<String, String>;

/// Stable project identifier: the basename of the registered path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        ProjectId(value.to_string())
    }
}

/// Which diagram an artifact depicts. Determines the file-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagramKind {
    /// Combined callee + caller diagram (coarse granularity).
    Function,
    FunctionCallee,
    FunctionCaller,
    Struct,
}

impl DiagramKind {
    /// File-name prefix used by the disk artifact cache.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagramKind::Function => "function",
            DiagramKind::FunctionCallee => "function_callee",
            DiagramKind::FunctionCaller => "function_caller",
            DiagramKind::Struct => "struct",
        }
    }
}

/// How function-mode requests are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Separate callee and caller diagrams.
    #[default]
    Fine,
    /// One combined diagram per function.
    Coarse,
}

/// Which companion text file(s) become the display text in function mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayText {
    /// Text of the last diagram kind processed (the caller diagram).
    #[default]
    #[serde(alias = "last_kind")]
    Last,
    /// Every generated text file, callee first, joined with a newline.
    Combined,
}

/// Body of `POST /draw/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub project: String,
    #[serde(default)]
    pub is_function_type: bool,
    #[serde(default)]
    pub selected_function: String,
    #[serde(default)]
    pub selected_struct: String,
}

impl DrawRequest {
    pub fn function(project: &str, function: &str) -> Self {
        DrawRequest {
            project: project.to_string(),
            is_function_type: true,
            selected_function: function.to_string(),
            selected_struct: String::new(),
        }
    }

    pub fn structure(project: &str, name: &str) -> Self {
        DrawRequest {
            project: project.to_string(),
            is_function_type: false,
            selected_function: String::new(),
            selected_struct: name.to_string(),
        }
    }
}

/// In-band outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStatus {
    Success,
    Fail,
}

/// Body returned by `POST /draw/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    pub status: DrawStatus,
    pub display_text: String,
    pub callee_code_snippet: Snippets,
    pub caller_code_snippet: Snippets,
    pub struct_code_snippet: Snippets,
}

impl DrawResponse {
    /// Soft failure: empty text, empty snippet maps.
    pub fn fail() -> Self {
        DrawResponse {
            status: DrawStatus::Fail,
            display_text: String::new(),
            callee_code_snippet: Snippets::new(),
            caller_code_snippet: Snippets::new(),
            struct_code_snippet: Snippets::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DrawStatus::Success
    }
}
