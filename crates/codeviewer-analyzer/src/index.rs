//! Project-wide code index: call graph and struct reference graph on petgraph

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use anyhow::Result;
use codeviewer_core::Relation;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::{debug, warn};

use crate::parser::{CallRef, FileUnit, FunctionDef, GoParser, StructDef};

/// Relation key for functions without a receiver.
pub const FREE_FUNCTIONS: &str = "-";

/// Edge produced by a traversal: `(from, to, label)`.
pub type Edge = (String, String, Option<String>);

pub struct CodeIndex {
    functions: Vec<FunctionDef>,
    structs: Vec<StructDef>,
    /// Node weights are indices into `functions`.
    calls: DiGraph<usize, ()>,
    call_nodes: Vec<NodeIndex>,
    /// Node weights are indices into `structs`; edge weights are field names.
    refs: DiGraph<usize, String>,
    ref_nodes: Vec<NodeIndex>,
}

impl std::fmt::Debug for CodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeIndex")
            .field("functions", &self.functions.len())
            .field("structs", &self.structs.len())
            .field("call_edges", &self.calls.edge_count())
            .field("ref_edges", &self.refs.edge_count())
            .finish()
    }
}

impl CodeIndex {
    /// Parse every Go file under `root` (gitignore-aware, skipping `vendor/`
    /// and `_test.go` files) and resolve the graphs.
    pub fn build(root: &Path) -> Result<Self> {
        let mut parser = GoParser::new()?;
        let mut units = Vec::new();

        let walker = ignore::WalkBuilder::new(root)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| entry.file_name() != "vendor" && entry.file_name() != "testdata")
            .build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(".go") || file_name.ends_with("_test.go") || !path.is_file() {
                continue;
            }

            let rel = path.strip_prefix(root).unwrap_or(path);
            let file = slash_path(rel);
            let module = rel.parent().map(slash_path).unwrap_or_default();

            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Failed to read file {}: {}", path.display(), e);
                    continue;
                }
            };
            match parser.parse(&module, &file, &source) {
                Ok(unit) => units.push(unit),
                Err(e) => warn!("Failed to parse {}: {}", path.display(), e),
            }
        }

        if units.is_empty() {
            warn!("No Go sources found under {}", root.display());
        }
        Ok(Self::from_units(units))
    }

    /// Resolve calls and field references across parsed files.
    pub fn from_units(mut units: Vec<FileUnit>) -> Self {
        units.sort_by(|a, b| a.module.cmp(&b.module));

        let mut functions = Vec::new();
        let mut structs = Vec::new();
        // imports of the file each function/struct came from
        let mut fn_imports = Vec::new();
        let mut struct_imports = Vec::new();
        for unit in &units {
            for f in &unit.functions {
                functions.push(f.clone());
                fn_imports.push(&unit.imports);
            }
            for s in &unit.structs {
                structs.push(s.clone());
                struct_imports.push(&unit.imports);
            }
        }
        let modules: HashSet<&str> = units.iter().map(|u| u.module.as_str()).collect();
        let resolver = Resolver::new(&functions, &structs, modules);

        let mut calls = DiGraph::new();
        let call_nodes: Vec<_> = (0..functions.len()).map(|i| calls.add_node(i)).collect();
        for (i, f) in functions.iter().enumerate() {
            for call in &f.calls {
                for target in resolver.call_targets(f, call, fn_imports[i]) {
                    calls.update_edge(call_nodes[i], call_nodes[target], ());
                }
            }
        }

        let mut refs = DiGraph::new();
        let ref_nodes: Vec<_> = (0..structs.len()).map(|i| refs.add_node(i)).collect();
        for (i, s) in structs.iter().enumerate() {
            for field in &s.fields {
                if let Some(target) =
                    resolver.struct_target(&s.module, field.qualifier.as_deref(), &field.type_name, struct_imports[i])
                {
                    refs.add_edge(ref_nodes[i], ref_nodes[target], field.field.clone());
                }
            }
        }

        debug!(
            "Indexed {} functions ({} calls), {} structs ({} references)",
            functions.len(),
            calls.edge_count(),
            structs.len(),
            refs.edge_count()
        );

        CodeIndex {
            functions,
            structs,
            calls,
            call_nodes,
            refs,
            ref_nodes,
        }
    }

    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    pub fn structs(&self) -> &[StructDef] {
        &self.structs
    }

    /// Module → struct → function identifiers, in declaration order.
    /// Free functions are grouped under [`FREE_FUNCTIONS`]; structs without
    /// methods are listed with an empty function list.
    pub fn relation(&self) -> Relation {
        let mut relation = Relation::new();
        for s in &self.structs {
            relation
                .entry(s.module.clone())
                .or_default()
                .entry(s.name.clone())
                .or_default();
        }
        for f in &self.functions {
            let key = f.receiver.clone().unwrap_or_else(|| FREE_FUNCTIONS.to_string());
            relation
                .entry(f.module.clone())
                .or_default()
                .entry(key)
                .or_insert_with(Vec::new)
                .push(f.id.clone());
        }
        relation
    }

    /// Functions matching `name`: an exact identifier, otherwise any
    /// identifier ending in `/<name>` or `.<name>`.
    pub fn find_functions(&self, name: &str) -> Vec<usize> {
        if let Some(i) = self.functions.iter().position(|f| f.id == name) {
            return vec![i];
        }
        let (path_suffix, method_suffix) = (format!("/{}", name), format!(".{}", name));
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.id.ends_with(&path_suffix) || f.id.ends_with(&method_suffix))
            .map(|(i, _)| i)
            .collect()
    }

    /// Structs matching `name`: `module/Name` exactly, or every struct called `Name`.
    pub fn find_structs(&self, name: &str) -> Vec<usize> {
        if name.contains('/') {
            return self
                .structs
                .iter()
                .position(|s| s.id == name)
                .into_iter()
                .collect();
        }
        self.structs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name == name)
            .map(|(i, _)| i)
            .collect()
    }

    /// Methods declared on a struct, in declaration order.
    pub fn methods_of(&self, s: usize) -> Vec<usize> {
        let target = &self.structs[s];
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.module == target.module && f.receiver.as_deref() == Some(target.name.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Direct callees or callers of a function.
    pub fn neighbors(&self, f: usize, direction: Direction) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .calls
            .neighbors_directed(self.call_nodes[f], direction)
            .map(|n| self.calls[n])
            .collect();
        out.sort_unstable();
        out
    }

    /// Call edges reachable from `roots` within `depth` hops. For
    /// `Direction::Incoming` the edges still point caller → callee.
    pub fn call_edges(&self, roots: &[usize], direction: Direction, depth: usize) -> Vec<Edge> {
        let starts: Vec<_> = roots.iter().map(|&r| self.call_nodes[r]).collect();
        bfs(&self.calls, &starts, direction, depth)
            .into_iter()
            .map(|(a, b, _)| {
                let (from, to) = match direction {
                    Direction::Outgoing => (a, b),
                    Direction::Incoming => (b, a),
                };
                (
                    self.functions[self.calls[from]].id.clone(),
                    self.functions[self.calls[to]].id.clone(),
                    None,
                )
            })
            .collect()
    }

    /// Struct references reachable from `roots` within `depth` hops, plus
    /// the structs that refer to a root directly.
    pub fn struct_edges(&self, roots: &[usize], depth: usize) -> Vec<Edge> {
        let starts: Vec<_> = roots.iter().map(|&r| self.ref_nodes[r]).collect();
        let mut edges: Vec<Edge> = bfs(&self.refs, &starts, Direction::Outgoing, depth)
            .into_iter()
            .map(|(from, to, label)| {
                (
                    self.structs[self.refs[from]].id.clone(),
                    self.structs[self.refs[to]].id.clone(),
                    label,
                )
            })
            .collect();

        for &start in &starts {
            for edge in self.refs.edges_directed(start, Direction::Incoming) {
                let item = (
                    self.structs[self.refs[edge.source()]].id.clone(),
                    self.structs[self.refs[start]].id.clone(),
                    Some(edge.weight().clone()),
                );
                if !edges.contains(&item) {
                    edges.push(item);
                }
            }
        }
        edges
    }
}

/// Edge weights that can label a diagram edge.
trait EdgeLabel {
    fn label(&self) -> Option<String>;
}

impl EdgeLabel for () {
    fn label(&self) -> Option<String> {
        None
    }
}

impl EdgeLabel for String {
    fn label(&self) -> Option<String> {
        if self.is_empty() { None } else { Some(self.clone()) }
    }
}

/// Breadth-first traversal returning `(visited_from, reached, label)` per edge.
fn bfs<W: EdgeLabel>(
    graph: &DiGraph<usize, W>,
    starts: &[NodeIndex],
    direction: Direction,
    depth: usize,
) -> Vec<(NodeIndex, NodeIndex, Option<String>)> {
    let mut seen: HashSet<NodeIndex> = starts.iter().copied().collect();
    let mut queue: VecDeque<(NodeIndex, usize)> = starts.iter().map(|&s| (s, 0)).collect();
    let mut edges = Vec::new();

    while let Some((node, level)) = queue.pop_front() {
        if level >= depth {
            continue;
        }
        let mut next: Vec<_> = graph
            .edges_directed(node, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (other, e.weight().label())
            })
            .collect();
        next.sort_by_key(|(n, _)| graph[*n]);

        for (other, label) in next {
            edges.push((node, other, label));
            if seen.insert(other) {
                queue.push_back((other, level + 1));
            }
        }
    }
    edges
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Name tables used to resolve call sites and field types.
struct Resolver<'a> {
    functions: &'a [FunctionDef],
    modules: HashSet<&'a str>,
    free: HashMap<(&'a str, &'a str), usize>,
    methods: HashMap<&'a str, Vec<usize>>,
    structs: HashMap<(&'a str, &'a str), usize>,
    struct_names: BTreeMap<&'a str, Vec<usize>>,
}

impl<'a> Resolver<'a> {
    fn new(functions: &'a [FunctionDef], structs: &'a [StructDef], modules: HashSet<&'a str>) -> Self {
        let mut free = HashMap::new();
        let mut methods: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, f) in functions.iter().enumerate() {
            match f.receiver {
                Some(_) => methods.entry(f.name.as_str()).or_default().push(i),
                None => {
                    free.insert((f.module.as_str(), f.name.as_str()), i);
                }
            }
        }
        let mut by_module = HashMap::new();
        let mut struct_names: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, s) in structs.iter().enumerate() {
            by_module.insert((s.module.as_str(), s.name.as_str()), i);
            struct_names.entry(s.name.as_str()).or_default().push(i);
        }
        Resolver {
            functions,
            modules,
            free,
            methods,
            structs: by_module,
            struct_names,
        }
    }

    /// Module whose directory is the tail of an import path.
    fn imported_module(&self, import_path: &str) -> Option<&'a str> {
        self.modules
            .iter()
            .copied()
            .filter(|m| import_path == *m || import_path.ends_with(&format!("/{}", m)))
            .max_by_key(|m| m.len())
    }

    fn call_targets(&self, caller: &FunctionDef, call: &CallRef, imports: &HashMap<String, String>) -> Vec<usize> {
        match call {
            CallRef::Plain(name) => self
                .free
                .get(&(caller.module.as_str(), name.as_str()))
                .copied()
                .into_iter()
                .collect(),
            CallRef::Selector { operand, name } => match imports.get(operand) {
                Some(path) => self
                    .imported_module(path)
                    .and_then(|m| self.free.get(&(m, name.as_str())).copied())
                    .into_iter()
                    .collect(),
                None => self.method_targets(caller, name),
            },
            CallRef::Method(name) => self.method_targets(caller, name),
        }
    }

    /// Prefer methods on the caller's own receiver type, then the caller's
    /// module, then a project-wide unique match.
    fn method_targets(&self, caller: &FunctionDef, name: &str) -> Vec<usize> {
        let Some(candidates) = self.methods.get(name) else {
            return Vec::new();
        };
        let same_module: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| self.functions[i].module == caller.module)
            .collect();
        if caller.receiver.is_some() {
            let same_receiver: Vec<usize> = same_module
                .iter()
                .copied()
                .filter(|&i| self.functions[i].receiver == caller.receiver)
                .collect();
            if !same_receiver.is_empty() {
                return same_receiver;
            }
        }
        if !same_module.is_empty() {
            return same_module;
        }
        if candidates.len() == 1 {
            return candidates.clone();
        }
        Vec::new()
    }

    fn struct_target(
        &self,
        module: &str,
        qualifier: Option<&str>,
        name: &str,
        imports: &HashMap<String, String>,
    ) -> Option<usize> {
        match qualifier {
            Some(q) => {
                let target_module = self.imported_module(imports.get(q)?)?;
                self.structs.get(&(target_module, name)).copied()
            }
            None => self.structs.get(&(module, name)).copied().or_else(|| {
                // dot imports leave no qualifier; accept a unique name
                self.struct_names
                    .get(name)
                    .filter(|c| c.len() == 1)
                    .map(|c| c[0])
            }),
        }
    }
}
