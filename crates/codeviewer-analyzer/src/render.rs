//! Diagram rendering: DOT source for Graphviz plus a plain-text listing

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use codeviewer_core::cache::{IMAGE_EXT, TEXT_EXT};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::index::Edge;

/// A rendered graph: one or more highlighted roots and the edges around them.
#[derive(Debug, Clone)]
pub struct Diagram {
    pub title: String,
    pub roots: Vec<String>,
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn new(title: impl Into<String>, roots: Vec<String>, edges: Vec<Edge>) -> Self {
        Diagram {
            title: title.into(),
            roots,
            edges,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn to_dot(&self) -> String {
        let mut s = String::new();
        s.push_str("digraph codeviewer\n{\n");
        let _ = writeln!(s, "  label=\"{}\";\n  labelloc=t;", escape_label(&self.title));
        s.push_str("  rankdir=LR;\n  graph [fontname=Helvetica];\n");
        s.push_str("  node [shape=box, fontsize=10, style=\"filled,rounded\", fillcolor=\"#f5f5f5\"];\n");
        s.push_str("  edge [fontname=Helvetica, fontsize=9];\n");

        for root in &self.roots {
            let _ = writeln!(
                s,
                "  \"{}\" [fillcolor=\"#ffd966\", penwidth=1.6];",
                escape_label(root)
            );
        }
        for (from, to, label) in &self.edges {
            match label {
                Some(label) => {
                    let _ = writeln!(
                        s,
                        "  \"{}\" -> \"{}\" [label=\"{}\"];",
                        escape_label(from),
                        escape_label(to),
                        escape_label(label)
                    );
                }
                None => {
                    let _ = writeln!(s, "  \"{}\" -> \"{}\";", escape_label(from), escape_label(to));
                }
            }
        }
        s.push_str("}\n");
        s
    }

    /// Header line followed by one `from -> to` line per edge.
    pub fn to_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{}", self.title);
        if self.edges.is_empty() {
            s.push_str("no relations found\n");
            return s;
        }
        for (from, to, label) in &self.edges {
            match label {
                Some(label) => {
                    let _ = writeln!(s, "{} -> {} ({})", from, to, label);
                }
                None => {
                    let _ = writeln!(s, "{} -> {}", from, to);
                }
            }
        }
        s
    }
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Write `<stem>.txt`, then render `<stem>.png` through Graphviz `dot`.
///
/// The image is written under a temporary name and renamed into place, so
/// the image never exists without its text file and is never partial.
pub async fn render(diagram: &Diagram, output_dir: &Path, stem: &str) -> Result<PathBuf> {
    render_with(GRAPHVIZ_DOT, diagram, output_dir, stem).await
}

/// Graphviz layout program used for every diagram.
pub const GRAPHVIZ_DOT: &str = "dot";

/// [`render`] through `program`, which must accept `dot`'s command line.
/// On any failure the temporary image is removed and the child reaped.
pub(crate) async fn render_with(program: &str, diagram: &Diagram, output_dir: &Path, stem: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("cannot create {}", output_dir.display()))?;

    let text_path = output_dir.join(format!("{}.{}", stem, TEXT_EXT));
    tokio::fs::write(&text_path, diagram.to_text())
        .await
        .with_context(|| format!("cannot write {}", text_path.display()))?;

    let image_path = output_dir.join(format!("{}.{}", stem, IMAGE_EXT));
    let tmp_path = output_dir.join(format!("{}.{}.tmp", stem, IMAGE_EXT));
    let dot = diagram.to_dot();

    let mut child = tokio::process::Command::new(program)
        .arg("-Tpng")
        .arg("-o")
        .arg(&tmp_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to run graphviz '{}'", program))?;
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(dot.as_bytes()).await {
            let _ = child.kill().await;
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("failed to feed graphviz '{}'", program));
        }
    }
    let output = match child.wait_with_output().await {
        Ok(output) => output,
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("failed to wait for graphviz '{}'", program));
        }
    };
    if !output.status.success() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        bail!(
            "graphviz '{}' failed with code {:?}: {}",
            program,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    tokio::fs::rename(&tmp_path, &image_path)
        .await
        .with_context(|| format!("cannot move image into {}", image_path.display()))?;
    debug!("Rendered {}", image_path.display());
    Ok(image_path)
}

/// Whether the Graphviz `dot` binary can be executed.
pub fn dot_available() -> bool {
    std::process::Command::new(GRAPHVIZ_DOT).arg("-V").output().is_ok()
}
