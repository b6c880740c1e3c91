//! The code model abstraction consumed by the inspections.

use super::{DeclId, Declaration, FileId, FileOrigin, Node, NodeId, Package, SourceFile, Usage};

/// Read-only view of a parsed and resolved project.
///
/// Implementations hand the inspections a language-agnostic tree with
/// semantic queries already answered: which declaration a usage refers to,
/// which annotations a declaration carries, what encloses what.
///
/// Every lookup returns `Option`: a missing answer is a resolution miss,
/// never an error.
pub trait CodeModel {
    /// All files, in a stable order.
    fn file_ids(&self) -> Vec<FileId>;

    fn file(&self, id: FileId) -> Option<&SourceFile>;

    fn node(&self, id: NodeId) -> Option<&Node>;

    fn declaration(&self, id: DeclId) -> Option<&Declaration>;

    /// Look up a package through the project's package index.
    fn package(&self, name: &str) -> Option<&Package>;

    /// Declarations whose innermost containing declaration is `owner`.
    fn members(&self, owner: DeclId) -> Vec<DeclId>;

    /// Whether `annotation` resolves in the resolve scope of `file`.
    ///
    /// Used as a cheap pre-check to skip files before traversal. The
    /// scope is the implementation's: it may be the whole project.
    fn can_annotation_be_used_in_file(&self, annotation: &str, file: FileId) -> bool;

    /// Usage sites of a file, in document order.
    fn usages(&self, file: FileId) -> &[Usage] {
        self.file(file).map(|f| f.usages.as_slice()).unwrap_or(&[])
    }

    /// Declarations of a file, in document order.
    fn declarations_in(&self, file: FileId) -> &[DeclId] {
        self.file(file)
            .map(|f| f.declarations.as_slice())
            .unwrap_or(&[])
    }

    /// Parent of a node, `None` at the file root.
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    /// Whether the declaration lives in library (non-project) code.
    fn is_library_declaration(&self, decl: DeclId) -> bool {
        self.declaration(decl)
            .and_then(|d| self.file(d.file))
            .map(|f| f.origin == FileOrigin::Library)
            .unwrap_or(false)
    }
}

/// Iterator over the strict ancestors of a node, innermost first.
pub struct Ancestors<'a, M: CodeModel + ?Sized> {
    model: &'a M,
    next: Option<NodeId>,
}

impl<'a, M: CodeModel + ?Sized> Iterator for Ancestors<'a, M> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.model.node(id)?;
        self.next = node.parent;
        Some((id, node))
    }
}

/// Walk the parent links of `node`, starting with its parent.
pub fn ancestors<M: CodeModel + ?Sized>(model: &M, node: NodeId) -> Ancestors<'_, M> {
    Ancestors {
        model,
        next: model.parent(node),
    }
}
