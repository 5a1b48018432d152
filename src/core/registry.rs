//! Table registry: a name-addressable tree of tables built from directory
//! sources.
//!
//! Sources arrive as plain values (see [`Source`]); reading them from disk
//! is the job of [`crate::io`]. A table may exist both as editable text and
//! as its derived JSON form. The JSON form wins and the text is treated as
//! stale and left unparsed.

use rand::Rng;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::core::table::{display_name, TableError, TableModel, TableRoll};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no table at '{0}'")]
    NotFound(String),
    #[error("table error: {0}")]
    Table(#[from] TableError),
    #[error("structured table error: {0}")]
    Structured(#[from] serde_json::Error),
    #[error("'{0}' is shadowed by a category of the same name")]
    Shadowed(String),
}

/// Raw text of one table: header line plus data lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    /// File stem, e.g. `01_Government`.
    pub id: String,
    pub header: String,
    pub lines: Vec<String>,
}

impl TableSource {
    /// Split file contents; the first non-blank line is the header.
    pub fn from_text(id: &str, text: &str) -> Self {
        let mut lines = text.lines().skip_while(|l| l.trim().is_empty());
        let header = lines.next().unwrap_or_default().to_string();
        Self {
            id: id.to_string(),
            header,
            lines: lines.map(str::to_string).collect(),
        }
    }
}

/// A table already materialized in its JSON form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredSource {
    pub id: String,
    pub json: String,
}

/// A named group of sources, e.g. one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySource {
    pub id: String,
    pub children: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Text(TableSource),
    Structured(StructuredSource),
    Directory(DirectorySource),
}

impl Source {
    pub fn id(&self) -> &str {
        match self {
            Source::Text(s) => &s.id,
            Source::Structured(s) => &s.id,
            Source::Directory(s) => &s.id,
        }
    }

    // Structured sorts before text so a stale text twin is never parsed.
    fn rank(&self) -> u8 {
        match self {
            Source::Structured(_) => 0,
            Source::Text(_) => 1,
            Source::Directory(_) => 2,
        }
    }
}

fn key_of(id: &str) -> String {
    display_name(id).to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Where a leaf table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Text,
    Structured,
}

#[derive(Debug)]
pub enum NodeKind {
    Leaf { table: TableModel, form: Form },
    Parent { children: BTreeMap<String, NodeId> },
}

#[derive(Debug)]
pub struct Node {
    name: String,
    /// Source ids below the root, ending with this node's own id. Follows
    /// the directories the node was read from; a merged category keeps the
    /// first directory's ids.
    source_path: Vec<String>,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_path(&self) -> &[String] {
        &self.source_path
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn table(&self) -> Option<&TableModel> {
        match &self.kind {
            NodeKind::Leaf { table, .. } => Some(table),
            NodeKind::Parent { .. } => None,
        }
    }
}

/// A leaf that was left out of the tree.
#[derive(Debug)]
pub struct RegistrationFailure {
    /// Display names from below the root down to the failed leaf.
    pub path: Vec<String>,
    pub error: RegistryError,
}

/// Tree of tables, stored as an arena. Node 0 is the root.
#[derive(Debug)]
pub struct TableRegistry {
    nodes: Vec<Node>,
    failures: Vec<RegistrationFailure>,
}

const ROOT: NodeId = NodeId(0);

impl TableRegistry {
    pub fn new(name: &str) -> Self {
        Self {
            nodes: vec![Node {
                name: display_name(name),
                source_path: Vec::new(),
                kind: NodeKind::Parent {
                    children: BTreeMap::new(),
                },
            }],
            failures: Vec::new(),
        }
    }

    /// Build a registry whose root is the given directory.
    pub fn from_directory(source: DirectorySource) -> Self {
        let mut registry = Self::new(&source.id);
        registry.register(source);
        registry
    }

    /// Merge a directory's children into the root. Registering the same
    /// directory again, or a later version of it, never duplicates a name.
    pub fn register(&mut self, source: DirectorySource) {
        self.register_children(ROOT, source.children, &[]);
        log::debug!(
            "registry '{}' holds {} tables",
            self.root().name,
            self.tables().len()
        );
    }

    // `dirs` is the on-disk directory chain the children were read from,
    // which differs from the node path once directories merge.
    fn register_children(&mut self, parent: NodeId, mut children: Vec<Source>, dirs: &[String]) {
        children.sort_by(|a, b| {
            key_of(a.id())
                .cmp(&key_of(b.id()))
                .then(a.rank().cmp(&b.rank()))
                .then(a.id().cmp(b.id()))
        });
        for child in children {
            self.register_source(parent, child, dirs);
        }
    }

    fn register_source(&mut self, parent: NodeId, source: Source, dirs: &[String]) {
        let key = key_of(source.id());
        let existing = self.child(parent, &key);
        let mut source_path = dirs.to_vec();
        source_path.push(source.id().to_string());

        match source {
            Source::Directory(dir) => {
                let child_dirs = source_path.clone();
                let id = match existing {
                    Some(id) if self.is_parent(id) => {
                        log::debug!("merging category '{}'", dir.id);
                        id
                    }
                    Some(id) => {
                        let shadowed = self.display_path(id).join("/");
                        self.fail(parent, &dir.id, RegistryError::Shadowed(shadowed));
                        self.nodes[id.0].source_path = source_path;
                        self.nodes[id.0].kind = NodeKind::Parent {
                            children: BTreeMap::new(),
                        };
                        id
                    }
                    None => self.insert(
                        parent,
                        key,
                        &dir.id,
                        source_path,
                        NodeKind::Parent {
                            children: BTreeMap::new(),
                        },
                    ),
                };
                self.register_children(id, dir.children, &child_dirs);
            }
            Source::Structured(src) => {
                let replaces = match existing {
                    Some(id) if self.is_parent(id) => {
                        let shadowed = self.path_for(parent, &src.id).join("/");
                        self.fail(parent, &src.id, RegistryError::Shadowed(shadowed));
                        return;
                    }
                    Some(id) if self.form(id) == Some(Form::Structured) => {
                        log::debug!("keeping first structured table for '{}'", src.id);
                        return;
                    }
                    other => other,
                };
                let table = match serde_json::from_str::<TableModel>(&src.json) {
                    Ok(table) => table,
                    Err(e) => {
                        self.fail(parent, &src.id, e.into());
                        return;
                    }
                };
                let kind = NodeKind::Leaf {
                    table,
                    form: Form::Structured,
                };
                match replaces {
                    Some(id) => {
                        log::debug!("structured '{}' replaces its text form", src.id);
                        self.nodes[id.0].source_path = source_path;
                        self.nodes[id.0].kind = kind;
                    }
                    None => {
                        self.insert(parent, key, &src.id, source_path, kind);
                    }
                }
            }
            Source::Text(src) => {
                match existing {
                    Some(id) if self.is_parent(id) => {
                        let shadowed = self.path_for(parent, &src.id).join("/");
                        self.fail(parent, &src.id, RegistryError::Shadowed(shadowed));
                        return;
                    }
                    Some(_) => {
                        log::debug!("text table '{}' is stale, skipping", src.id);
                        return;
                    }
                    None => {}
                }
                let name = display_name(&src.id);
                let parsed =
                    TableModel::parse(&name, &src.header, src.lines.iter().map(String::as_str));
                match parsed {
                    Ok(parsed) => {
                        let kind = NodeKind::Leaf {
                            table: parsed.table,
                            form: Form::Text,
                        };
                        self.insert(parent, key, &src.id, source_path, kind);
                    }
                    Err(e) => self.fail(parent, &src.id, e.into()),
                }
            }
        }
    }

    fn insert(
        &mut self,
        parent: NodeId,
        key: String,
        id: &str,
        source_path: Vec<String>,
        kind: NodeKind,
    ) -> NodeId {
        let node_id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: display_name(id),
            source_path,
            kind,
        });
        if let NodeKind::Parent { children } = &mut self.nodes[parent.0].kind {
            children.insert(key, node_id);
        }
        node_id
    }

    fn fail(&mut self, parent: NodeId, id: &str, error: RegistryError) {
        let path = self.path_for(parent, id);
        log::warn!("skipping table '{}': {}", path.join("/"), error);
        self.failures.push(RegistrationFailure { path, error });
    }

    fn child(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        match &self.nodes[parent.0].kind {
            NodeKind::Parent { children } => children.get(key).copied(),
            NodeKind::Leaf { .. } => None,
        }
    }

    fn is_parent(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Parent { .. })
    }

    fn form(&self, id: NodeId) -> Option<Form> {
        match self.nodes[id.0].kind {
            NodeKind::Leaf { form, .. } => Some(form),
            NodeKind::Parent { .. } => None,
        }
    }

    fn path_for(&self, parent: NodeId, id: &str) -> Vec<String> {
        let mut path = self.display_path(parent);
        path.push(display_name(id));
        path
    }

    // Display names below the root, found by walking down from the root.
    fn display_path(&self, target: NodeId) -> Vec<String> {
        fn walk(reg: &TableRegistry, at: NodeId, target: NodeId, path: &mut Vec<String>) -> bool {
            if at == target {
                return true;
            }
            if let NodeKind::Parent { children } = &reg.nodes[at.0].kind {
                for &child in children.values() {
                    path.push(reg.nodes[child.0].name.clone());
                    if walk(reg, child, target, path) {
                        return true;
                    }
                    path.pop();
                }
            }
            false
        }
        let mut path = Vec::new();
        walk(self, ROOT, target, &mut path);
        path
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT.0]
    }

    /// Find a node by display names, compared case-insensitively.
    pub fn node<S: AsRef<str>>(&self, path: &[S]) -> Result<&Node, RegistryError> {
        let mut at = ROOT;
        for segment in path {
            at = self
                .child(at, &segment.as_ref().to_lowercase())
                .ok_or_else(|| not_found(path))?;
        }
        Ok(&self.nodes[at.0])
    }

    /// Find a table by path. Categories are not tables.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Result<&TableModel, RegistryError> {
        self.node(path)?.table().ok_or_else(|| not_found(path))
    }

    /// Display names of a category's children, in order.
    pub fn children<S: AsRef<str>>(&self, path: &[S]) -> Result<Vec<&str>, RegistryError> {
        match &self.node(path)?.kind {
            NodeKind::Parent { children } => Ok(children
                .values()
                .map(|id| self.nodes[id.0].name.as_str())
                .collect()),
            NodeKind::Leaf { .. } => Err(not_found(path)),
        }
    }

    /// Display paths of every table, depth first.
    pub fn tables(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        self.collect_leaves(ROOT, &mut Vec::new(), &mut |path, _| out.push(path.to_vec()));
        out
    }

    /// Tables that were parsed from text and have no structured form yet.
    pub fn derived_tables(&self) -> Vec<&Node> {
        let mut ids = Vec::new();
        self.collect_leaves(ROOT, &mut Vec::new(), &mut |_, id| ids.push(id));
        ids.into_iter()
            .map(|id| &self.nodes[id.0])
            .filter(|node| matches!(node.kind, NodeKind::Leaf { form: Form::Text, .. }))
            .collect()
    }

    fn collect_leaves<F>(&self, at: NodeId, path: &mut Vec<String>, visit: &mut F)
    where
        F: FnMut(&[String], NodeId),
    {
        match &self.nodes[at.0].kind {
            NodeKind::Leaf { .. } => visit(path, at),
            NodeKind::Parent { children } => {
                for &child in children.values() {
                    path.push(self.nodes[child.0].name.clone());
                    self.collect_leaves(child, path, visit);
                    path.pop();
                }
            }
        }
    }

    pub fn failures(&self) -> &[RegistrationFailure] {
        &self.failures
    }

    /// Roll the die of the table at `path`.
    pub fn roll<S: AsRef<str>, R: Rng + ?Sized>(
        &self,
        path: &[S],
        rng: &mut R,
    ) -> Result<TableRoll<'_>, RegistryError> {
        Ok(self.get(path)?.roll(rng)?)
    }

    /// Look up an explicit die value on the table at `path`.
    pub fn roll_die<S: AsRef<str>>(&self, path: &[S], roll: u64) -> Result<TableRoll<'_>, RegistryError> {
        let entry = self.get(path)?.roll_die(roll)?;
        Ok(TableRoll { roll, entry })
    }
}

fn not_found<S: AsRef<str>>(path: &[S]) -> RegistryError {
    let joined = path.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/");
    RegistryError::NotFound(joined)
}

/// Write-once holder for a registry shared between threads.
///
/// The first caller of [`RegistryCell::get_or_build`] builds the registry;
/// concurrent callers block until it is ready and never build a second one.
#[derive(Debug, Default)]
pub struct RegistryCell {
    cell: OnceLock<TableRegistry>,
}

impl RegistryCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get_or_build<F>(&self, build: F) -> &TableRegistry
    where
        F: FnOnce() -> TableRegistry,
    {
        self.cell.get_or_init(build)
    }

    pub fn get(&self) -> Option<&TableRegistry> {
        self.cell.get()
    }
}
