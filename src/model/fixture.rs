//! Small builder for hand-made models in unit tests.

use super::{
    Annotation, CodeModel, DeclId, Declaration, DeclarationKind, FileId, FileOrigin, NodeId,
    NodeKind, ProjectModel, Span, TypeRef, Usage, UsageKind, Visibility,
};

pub(crate) const EXPENSIVE: &str = "asteroids.Expensive";

pub(crate) fn markers() -> Vec<String> {
    vec![EXPENSIVE.to_string()]
}

pub(crate) fn expensive() -> Annotation {
    Annotation::new(EXPENSIVE)
}

pub(crate) struct Fixture {
    pub model: ProjectModel,
    next_line: usize,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            model: ProjectModel::new(),
            next_line: 1,
        }
    }

    fn span(&mut self) -> Option<Span> {
        let span = Span::at(self.next_line, 5);
        self.next_line += 1;
        Some(span)
    }

    pub fn file(&mut self, path: &str, package: Option<&str>) -> FileId {
        if let Some(p) = package {
            self.model.add_package(p);
        }
        self.model
            .add_file(path, package.map(str::to_string), FileOrigin::Project)
    }

    pub fn library_file(&mut self, path: &str, package: Option<&str>) -> FileId {
        if let Some(p) = package {
            self.model.add_package(p);
        }
        self.model
            .add_file(path, package.map(str::to_string), FileOrigin::Library)
    }

    pub fn root(&self, file: FileId) -> NodeId {
        self.model.file(file).and_then(|f| f.root).unwrap()
    }

    /// Anchor node of a declaration.
    pub fn anchor(&self, decl: DeclId) -> NodeId {
        self.model.declaration(decl).and_then(|d| d.anchor).unwrap()
    }

    pub fn declare(
        &mut self,
        file: FileId,
        containing: Option<DeclId>,
        name: &str,
        kind: DeclarationKind,
        annotations: Vec<Annotation>,
    ) -> DeclId {
        let parent = match containing {
            Some(c) => self.anchor(c),
            None => self.root(file),
        };
        let span = self.span();
        let anchor = self
            .model
            .add_node(NodeKind::Declaration, Some(parent), file, span);

        let qualified_name = if kind.is_class_like() {
            let package = self.model.file(file).and_then(|f| f.package.clone());
            match (containing.and_then(|c| self.model.declaration(c)), package) {
                (Some(outer), _) => outer
                    .qualified_name
                    .as_ref()
                    .map(|q| format!("{}.{}", q, name)),
                (None, Some(p)) => Some(format!("{}.{}", p, name)),
                (None, None) => Some(name.to_string()),
            }
        } else {
            None
        };

        let mut decl = Declaration::new(name, kind, file);
        decl.qualified_name = qualified_name;
        decl.annotations = annotations;
        decl.containing = containing;
        decl.anchor = Some(anchor);
        self.model.add_declaration(decl)
    }

    pub fn class(
        &mut self,
        file: FileId,
        containing: Option<DeclId>,
        name: &str,
        annotations: Vec<Annotation>,
    ) -> DeclId {
        self.declare(file, containing, name, DeclarationKind::Class, annotations)
    }

    pub fn method(&mut self, class: DeclId, name: &str, annotations: Vec<Annotation>) -> DeclId {
        let file = self.model.declaration(class).unwrap().file;
        self.declare(file, Some(class), name, DeclarationKind::Method, annotations)
    }

    pub fn field(&mut self, class: DeclId, name: &str, annotations: Vec<Annotation>) -> DeclId {
        let file = self.model.declaration(class).unwrap().file;
        self.declare(file, Some(class), name, DeclarationKind::Field, annotations)
    }

    pub fn set_visibility(&mut self, decl: DeclId, visibility: Visibility) {
        self.model.declaration_mut(decl).unwrap().visibility = visibility;
    }

    pub fn set_return_type(&mut self, decl: DeclId, ty: TypeRef) {
        self.model.declaration_mut(decl).unwrap().signature.return_type = Some(ty);
    }

    pub fn add_parameter(&mut self, decl: DeclId, ty: TypeRef) {
        self.model
            .declaration_mut(decl)
            .unwrap()
            .signature
            .parameters
            .push(ty);
    }

    pub fn set_field_type(&mut self, decl: DeclId, ty: TypeRef) {
        self.model.declaration_mut(decl).unwrap().signature.field_type = Some(ty);
    }

    pub fn add_supertype(&mut self, decl: DeclId, ty: TypeRef) {
        self.model
            .declaration_mut(decl)
            .unwrap()
            .signature
            .supertypes
            .push(ty);
    }

    /// Type reference resolving to a declared type.
    pub fn type_ref(&self, decl: DeclId) -> TypeRef {
        let name = self.model.declaration(decl).unwrap().name.clone();
        TypeRef::new(name, Some(decl))
    }

    /// Add an intermediate node (loop, lambda, ...).
    pub fn node(&mut self, file: FileId, parent: NodeId, kind: NodeKind) -> NodeId {
        let span = self.span();
        self.model.add_node(kind, Some(parent), file, span)
    }

    /// Add a usage site under `parent` referring to `target`.
    pub fn usage(
        &mut self,
        file: FileId,
        parent: NodeId,
        kind: UsageKind,
        target: Option<DeclId>,
    ) -> NodeId {
        let node_kind = match kind {
            UsageKind::Reference => NodeKind::Call,
            UsageKind::ConstructorInvocation => NodeKind::New,
            UsageKind::ImportReference => NodeKind::Import,
            UsageKind::MethodOverride => NodeKind::Declaration,
        };
        let source = self.node(file, parent, node_kind);
        self.model.add_usage(
            file,
            Usage {
                kind,
                source,
                target,
            },
        );
        source
    }

    /// Plain reference (call) to `target`.
    pub fn call(&mut self, file: FileId, parent: NodeId, target: DeclId) -> NodeId {
        self.usage(file, parent, UsageKind::Reference, Some(target))
    }

    /// Record that `method` overrides `overridden`.
    pub fn override_edge(&mut self, method: DeclId, overridden: DeclId) {
        let file = self.model.declaration(method).unwrap().file;
        let source = self.anchor(method);
        self.model.add_usage(
            file,
            Usage {
                kind: UsageKind::MethodOverride,
                source,
                target: Some(overridden),
            },
        );
    }
}
