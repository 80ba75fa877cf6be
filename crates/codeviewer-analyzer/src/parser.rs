//! Go source extraction using tree-sitter
//!
//! Produces the declarations of one file: functions and methods with the
//! calls they make, structs with the types their fields reference, and the
//! file's import table. Resolution across files happens in [`crate::index`].

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use tree_sitter::{Node, Parser};

/// A call site as written, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallRef {
    /// `helper()`
    Plain(String),
    /// `x.Name()` where `x` is a plain identifier: package or receiver.
    Selector { operand: String, name: String },
    /// `a.b.Name()` or `f().Name()`: a method on some expression.
    Method(String),
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// `<module>/<Name>` or `<module>/<Type>.<Name>`
    pub id: String,
    pub module: String,
    pub receiver: Option<String>,
    pub name: String,
    pub file: String,
    pub line_start: usize,
    pub line_end: usize,
    pub source: String,
    pub calls: Vec<CallRef>,
}

/// A type referenced by a struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub field: String,
    pub type_name: String,
    /// Package qualifier, e.g. `time` in `time.Time`.
    pub qualifier: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    /// `<module>/<Name>`
    pub id: String,
    pub module: String,
    pub name: String,
    pub file: String,
    pub line_start: usize,
    pub line_end: usize,
    pub source: String,
    pub fields: Vec<FieldRef>,
}

/// Everything extracted from one `.go` file.
#[derive(Debug, Clone, Default)]
pub struct FileUnit {
    pub module: String,
    pub package: String,
    /// Import alias → import path.
    pub imports: HashMap<String, String>,
    pub functions: Vec<FunctionDef>,
    pub structs: Vec<StructDef>,
}

/// Reusable Go parser.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| anyhow!("Failed to set language: {}", e))?;
        Ok(GoParser { parser })
    }

    /// Parse one file. `module` is the file's directory relative to the
    /// project root; an empty module means the root package, which is named
    /// after its `package` clause.
    pub fn parse(&mut self, module: &str, file: &str, source: &str) -> Result<FileUnit> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("tree-sitter returned no tree for {}", file))?;
        let root = tree.root_node();

        let mut unit = FileUnit::default();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == "package_clause" {
                if let Some(name) = first_of_kind(child, "package_identifier") {
                    unit.package = text(name, source).to_string();
                }
            }
        }
        unit.module = if module.is_empty() {
            unit.package.clone()
        } else {
            module.to_string()
        };

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "import_declaration" => collect_imports(child, source, &mut unit.imports),
                "function_declaration" => {
                    if let Some(def) = function_def(child, None, &unit.module, file, source) {
                        unit.functions.push(def);
                    }
                }
                "method_declaration" => {
                    let receiver = child
                        .child_by_field_name("receiver")
                        .and_then(|r| first_of_kind(r, "type_identifier"))
                        .map(|t| text(t, source).to_string());
                    if let Some(def) = function_def(child, receiver, &unit.module, file, source) {
                        unit.functions.push(def);
                    }
                }
                "type_declaration" => collect_structs(child, &unit.module, file, source, &mut unit.structs),
                _ => {}
            }
        }

        Ok(unit)
    }
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Visit every descendant of `node` in pre-order.
fn walk<'t>(node: Node<'t>, visit: &mut impl FnMut(Node<'t>)) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child);
        walk(child, visit);
    }
}

fn first_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut found = None;
    walk(node, &mut |n| {
        if found.is_none() && n.kind() == kind {
            found = Some(n);
        }
    });
    found
}

fn collect_imports(decl: Node, source: &str, imports: &mut HashMap<String, String>) {
    walk(decl, &mut |n| {
        if n.kind() != "import_spec" {
            return;
        }
        let Some(path) = n.child_by_field_name("path") else {
            return;
        };
        let path = text(path, source).trim_matches(|c| c == '"' || c == '`').to_string();
        let alias = match n.child_by_field_name("name") {
            Some(name) if name.kind() == "package_identifier" => text(name, source).to_string(),
            // blank and dot imports cannot be used as qualifiers
            Some(_) => return,
            None => path.rsplit('/').next().unwrap_or(&path).to_string(),
        };
        imports.insert(alias, path);
    });
}

fn function_def(node: Node, receiver: Option<String>, module: &str, file: &str, source: &str) -> Option<FunctionDef> {
    let name = text(node.child_by_field_name("name")?, source).to_string();
    let id = match &receiver {
        Some(recv) => format!("{}/{}.{}", module, recv, name),
        None => format!("{}/{}", module, name),
    };

    let mut calls = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        walk(body, &mut |n| {
            if n.kind() == "call_expression" {
                if let Some(call) = call_ref(n, source) {
                    calls.push(call);
                }
            }
        });
    }

    Some(FunctionDef {
        id,
        module: module.to_string(),
        receiver,
        name,
        file: file.to_string(),
        line_start: node.start_position().row + 1,
        line_end: node.end_position().row + 1,
        source: text(node, source).to_string(),
        calls,
    })
}

fn call_ref(call: Node, source: &str) -> Option<CallRef> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(CallRef::Plain(text(function, source).to_string())),
        "selector_expression" => {
            let name = text(function.child_by_field_name("field")?, source).to_string();
            let operand = function.child_by_field_name("operand")?;
            if operand.kind() == "identifier" {
                Some(CallRef::Selector {
                    operand: text(operand, source).to_string(),
                    name,
                })
            } else {
                Some(CallRef::Method(name))
            }
        }
        _ => None,
    }
}

fn collect_structs(decl: Node, module: &str, file: &str, source: &str, out: &mut Vec<StructDef>) {
    let mut cursor = decl.walk();
    for spec in decl.named_children(&mut cursor) {
        if spec.kind() != "type_spec" {
            continue;
        }
        let (Some(name), Some(ty)) = (spec.child_by_field_name("name"), spec.child_by_field_name("type")) else {
            continue;
        };
        if ty.kind() != "struct_type" {
            continue;
        }
        let name = text(name, source).to_string();

        let mut fields = Vec::new();
        walk(ty, &mut |n| {
            if n.kind() == "field_declaration" {
                fields.extend(field_refs(n, source));
            }
        });

        // a lone spec inside `type X struct` spans the whole declaration
        let span = if decl.named_child_count() == 1 { decl } else { spec };
        out.push(StructDef {
            id: format!("{}/{}", module, name),
            module: module.to_string(),
            name,
            file: file.to_string(),
            line_start: span.start_position().row + 1,
            line_end: span.end_position().row + 1,
            source: text(span, source).to_string(),
            fields,
        });
    }
}

fn field_refs(field: Node, source: &str) -> Vec<FieldRef> {
    let Some(ty) = field.child_by_field_name("type") else {
        return Vec::new();
    };

    let mut names = Vec::new();
    let mut cursor = field.walk();
    for child in field.named_children(&mut cursor) {
        if child.kind() == "field_identifier" {
            names.push(text(child, source).to_string());
        }
    }

    let mut types = Vec::new();
    let mut record = |n: Node| {
        if n.kind() != "type_identifier" {
            return;
        }
        let qualifier = n
            .parent()
            .filter(|p| p.kind() == "qualified_type")
            .and_then(|p| p.child_by_field_name("package"))
            .map(|p| text(p, source).to_string());
        types.push((text(n, source).to_string(), qualifier));
    };
    record(ty);
    walk(ty, &mut record);

    // embedded fields are named after their type
    if names.is_empty() {
        names = types.iter().take(1).map(|(t, _)| t.clone()).collect();
    }

    let mut refs = Vec::new();
    for name in &names {
        for (type_name, qualifier) in &types {
            refs.push(FieldRef {
                field: name.clone(),
                type_name: type_name.clone(),
                qualifier: qualifier.clone(),
            });
        }
    }
    refs
}
