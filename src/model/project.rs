//! In-memory, serializable code model.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::{
    Annotation, CodeModel, DeclId, Declaration, DeclarationKind, FileId, FileOrigin, Node,
    NodeId, NodeKind, Package, SourceFile, Span, Usage,
};

/// Errors raised while loading a serialized model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{what} {index} refers to missing {missing} {target}")]
    DanglingReference {
        what: &'static str,
        index: usize,
        missing: &'static str,
        target: usize,
    },
    #[error("{what} {index} is its own ancestor through `{link}` links")]
    Cycle {
        what: &'static str,
        index: usize,
        link: &'static str,
    },
}

/// Arena-backed project model.
///
/// Files, nodes and declarations live in flat vectors and refer to each
/// other by index. Frontends build one with the `add_*` methods; hosts that
/// resolve code elsewhere can hand one over as JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProjectModel {
    #[serde(default)]
    files: Vec<SourceFile>,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    declarations: Vec<Declaration>,
    #[serde(default)]
    packages: BTreeMap<String, Package>,
    /// Annotation types known anywhere in the model (declared or applied).
    #[serde(skip)]
    known_annotations: OnceCell<HashSet<String>>,
}

impl ProjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse a model from JSON and check that every index is in range and
    /// that parent chains terminate.
    pub fn from_json(content: &str) -> Result<Self, ModelError> {
        let model: ProjectModel = serde_json::from_str(content)?;
        model.check_references()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add a file together with its root node.
    pub fn add_file(
        &mut self,
        path: impl Into<String>,
        package: Option<String>,
        origin: FileOrigin,
    ) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(SourceFile {
            path: path.into(),
            package,
            origin,
            root: None,
            declarations: Vec::new(),
            usages: Vec::new(),
        });
        let root = self.add_node(NodeKind::File, None, id, None);
        self.files[id.0].root = Some(root);
        id
    }

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
        file: FileId,
        span: Option<Span>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            file,
            span,
        });
        id
    }

    /// Add a declaration and register it with its file.
    pub fn add_declaration(&mut self, declaration: Declaration) -> DeclId {
        let id = DeclId(self.declarations.len());
        let file = declaration.file;
        self.declarations.push(declaration);
        if let Some(f) = self.files.get_mut(file.0) {
            f.declarations.push(id);
        }
        self.known_annotations = OnceCell::new();
        id
    }

    pub fn declaration_mut(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.known_annotations = OnceCell::new();
        self.declarations.get_mut(id.0)
    }

    /// Append a usage site to a file.
    pub fn add_usage(&mut self, file: FileId, usage: Usage) {
        if let Some(f) = self.files.get_mut(file.0) {
            f.usages.push(usage);
        }
    }

    /// Attach an annotation to a package, creating the package entry.
    pub fn annotate_package(&mut self, name: &str, annotation: Annotation) {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| Package {
                name: name.to_string(),
                annotations: Vec::new(),
            })
            .annotations
            .push(annotation);
        self.known_annotations = OnceCell::new();
    }

    /// Register a package without annotations.
    pub fn add_package(&mut self, name: &str) {
        self.packages.entry(name.to_string()).or_insert_with(|| Package {
            name: name.to_string(),
            annotations: Vec::new(),
        });
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn declaration_count(&self) -> usize {
        self.declarations.len()
    }

    /// Find a file by its path.
    pub fn find_file(&self, path: &str) -> Option<FileId> {
        self.files.iter().position(|f| f.path == path).map(FileId)
    }

    /// Find declarations by simple name.
    pub fn find_declarations(&self, name: &str) -> Vec<DeclId> {
        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.name == name)
            .map(|(i, _)| DeclId(i))
            .collect()
    }

    fn known_annotations(&self) -> &HashSet<String> {
        self.known_annotations.get_or_init(|| {
            let mut known = HashSet::new();
            for decl in &self.declarations {
                if decl.kind == DeclarationKind::AnnotationType {
                    if let Some(q) = &decl.qualified_name {
                        known.insert(q.clone());
                    }
                }
                for annotation in &decl.annotations {
                    known.insert(annotation.qualified_name.clone());
                }
            }
            for package in self.packages.values() {
                for annotation in &package.annotations {
                    known.insert(annotation.qualified_name.clone());
                }
            }
            known
        })
    }

    fn check_references(&self) -> Result<(), ModelError> {
        let files = self.files.len();
        let nodes = self.nodes.len();
        let decls = self.declarations.len();

        let dangling = |what, index, missing, target| ModelError::DanglingReference {
            what,
            index,
            missing,
            target,
        };

        for (i, node) in self.nodes.iter().enumerate() {
            if node.file.0 >= files {
                return Err(dangling("node", i, "file", node.file.0));
            }
            if let Some(p) = node.parent {
                if p.0 >= nodes {
                    return Err(dangling("node", i, "node", p.0));
                }
            }
        }
        for (i, decl) in self.declarations.iter().enumerate() {
            if decl.file.0 >= files {
                return Err(dangling("declaration", i, "file", decl.file.0));
            }
            if let Some(c) = decl.containing {
                if c.0 >= decls {
                    return Err(dangling("declaration", i, "declaration", c.0));
                }
            }
            if let Some(a) = decl.anchor {
                if a.0 >= nodes {
                    return Err(dangling("declaration", i, "node", a.0));
                }
            }
        }
        for (i, file) in self.files.iter().enumerate() {
            for usage in &file.usages {
                if usage.source.0 >= nodes {
                    return Err(dangling("file", i, "node", usage.source.0));
                }
                if let Some(t) = usage.target {
                    if t.0 >= decls {
                        return Err(dangling("file", i, "declaration", t.0));
                    }
                }
            }
            for d in &file.declarations {
                if d.0 >= decls {
                    return Err(dangling("file", i, "declaration", d.0));
                }
            }
        }

        if let Some(index) = find_cycle(nodes, |i| self.nodes[i].parent.map(|p| p.0)) {
            return Err(ModelError::Cycle {
                what: "node",
                index,
                link: "parent",
            });
        }
        if let Some(index) = find_cycle(decls, |i| self.declarations[i].containing.map(|c| c.0)) {
            return Err(ModelError::Cycle {
                what: "declaration",
                index,
                link: "containing",
            });
        }
        Ok(())
    }
}

/// First index found on a cycle of the `next` links, if any.
///
/// Every link must already be in range.
fn find_cycle(len: usize, next: impl Fn(usize) -> Option<usize>) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; len];
    let mut path = Vec::new();
    for start in 0..len {
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::OnPath => return Some(i),
                Mark::Unvisited => {}
            }
            marks[i] = Mark::OnPath;
            path.push(i);
            current = next(i);
        }
        for i in path.drain(..) {
            marks[i] = Mark::Done;
        }
    }
    None
}

impl CodeModel for ProjectModel {
    fn file_ids(&self) -> Vec<FileId> {
        (0..self.files.len()).map(FileId).collect()
    }

    fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0)
    }

    fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    fn members(&self, owner: DeclId) -> Vec<DeclId> {
        let Some(decl) = self.declaration(owner) else {
            return Vec::new();
        };
        self.declarations_in(decl.file)
            .iter()
            .copied()
            .filter(|id| {
                self.declaration(*id)
                    .map(|d| d.containing == Some(owner))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// All files share one resolve scope: the annotation only has to be
    /// declared or applied somewhere in the model.
    fn can_annotation_be_used_in_file(&self, annotation: &str, file: FileId) -> bool {
        self.file(file).is_some() && self.known_annotations().contains(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ancestors;

    #[test]
    fn test_add_file_creates_root() {
        let mut model = ProjectModel::new();
        let file = model.add_file("src/A.java", Some("a".to_string()), FileOrigin::Project);

        let root = model.file(file).unwrap().root.unwrap();
        assert_eq!(model.node(root).unwrap().kind, NodeKind::File);
        assert_eq!(model.find_file("src/A.java"), Some(file));
    }

    #[test]
    fn test_ancestors_innermost_first() {
        let mut model = ProjectModel::new();
        let file = model.add_file("A.java", None, FileOrigin::Project);
        let root = model.file(file).unwrap().root;
        let class = model.add_node(NodeKind::Declaration, root, file, None);
        let lambda = model.add_node(NodeKind::Lambda, Some(class), file, None);
        let call = model.add_node(NodeKind::Call, Some(lambda), file, None);

        let kinds: Vec<_> = ancestors(&model, call).map(|(_, n)| n.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Lambda, NodeKind::Declaration, NodeKind::File]
        );
    }

    #[test]
    fn test_members_and_known_annotations() {
        let mut model = ProjectModel::new();
        let file = model.add_file("A.java", None, FileOrigin::Library);
        let class = model.add_declaration(Declaration::new("A", DeclarationKind::Class, file));
        let mut method = Declaration::new("run", DeclarationKind::Method, file);
        method.containing = Some(class);
        method.annotations.push(Annotation::new("asteroids.Expensive"));
        let method = model.add_declaration(method);

        assert_eq!(model.members(class), vec![method]);
        assert!(model.can_annotation_be_used_in_file("asteroids.Expensive", file));
        assert!(!model.can_annotation_be_used_in_file("other.Marker", file));
        assert!(model.is_library_declaration(method));
    }

    #[test]
    fn test_annotation_scope_is_project_wide() {
        let mut model = ProjectModel::new();
        let lib = model.add_file("lib/Slow.java", None, FileOrigin::Library);
        let app = model.add_file("app/App.java", None, FileOrigin::Project);
        let mut marker = Declaration::new("Expensive", DeclarationKind::AnnotationType, lib);
        marker.qualified_name = Some("asteroids.Expensive".to_string());
        model.add_declaration(marker);

        assert!(model.can_annotation_be_used_in_file("asteroids.Expensive", app));
        assert!(!model.can_annotation_be_used_in_file("asteroids.Expensive", FileId(9)));
    }

    #[test]
    fn test_from_json_rejects_dangling_reference() {
        let json = r#"{
            "files": [{"path": "A.java"}],
            "nodes": [{"kind": "file", "file": 0}],
            "declarations": [{"name": "A", "kind": "class", "file": 0, "containing": 7}]
        }"#;
        let err = ProjectModel::from_json(json).unwrap_err();
        assert!(matches!(err, ModelError::DanglingReference { target: 7, .. }));
    }

    #[test]
    fn test_from_json_rejects_containing_cycle() {
        let json = r#"{
            "files": [{"path": "A.java", "root": 0}],
            "nodes": [{"kind": "file", "file": 0}],
            "declarations": [
                {"name": "A", "kind": "class", "file": 0, "containing": 1},
                {"name": "B", "kind": "class", "file": 0, "containing": 0},
                {"name": "Expensive", "kind": "annotation_type", "file": 0,
                 "qualified_name": "asteroids.Expensive"}
            ]
        }"#;
        let err = ProjectModel::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Cycle {
                what: "declaration",
                link: "containing",
                ..
            }
        ));
    }

    #[test]
    fn test_from_json_rejects_parent_cycle() {
        let json = r#"{
            "files": [{"path": "A.java", "root": 0}],
            "nodes": [
                {"kind": "file", "file": 0},
                {"kind": "lambda", "parent": 2, "file": 0},
                {"kind": "call", "parent": 1, "file": 0}
            ]
        }"#;
        let err = ProjectModel::from_json(json).unwrap_err();
        assert!(matches!(err, ModelError::Cycle { what: "node", .. }));
        assert!(err.to_string().contains("parent"));

        // A self-parented node is a cycle too
        let json = r#"{
            "files": [{"path": "A.java"}],
            "nodes": [{"kind": "file", "parent": 0, "file": 0}]
        }"#;
        assert!(matches!(
            ProjectModel::from_json(json).unwrap_err(),
            ModelError::Cycle { index: 0, .. }
        ));
    }

    #[test]
    fn test_from_json_loop_node() {
        let json = r#"{
            "files": [{"path": "A.java", "root": 0}],
            "nodes": [
                {"kind": "file", "file": 0},
                {"kind": {"loop": "for_each"}, "parent": 0, "file": 0}
            ]
        }"#;
        let model = ProjectModel::from_json(json).unwrap();
        assert!(model.node(NodeId(1)).unwrap().kind.is_loop());
    }
}
