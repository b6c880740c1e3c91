//! Java frontend using tree-sitter.
//!
//! Builds a [`ProjectModel`] from Java sources in three passes:
//!
//! 1. structure: files, declarations, loops and lambdas, with parent links
//! 2. declarations: annotations and signature types, resolved by name
//! 3. usages: calls, constructor invocations, field and type references,
//!    imports and override edges
//!
//! Name resolution is best effort. It knows about nested types, imports,
//! the current package and wildcard imports, plus enough local variable
//! typing to follow `receiver.method()` chains. Anything it cannot resolve
//! is left out of the model.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;

use globset::GlobSet;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use tracing::{debug, warn};
use tree_sitter::{Language, Node, Parser, Tree};

use crate::config::InspectionConfig;
use crate::model::{
    Annotation, AttributeValue, CodeModel, DeclId, Declaration, DeclarationKind, FileId,
    FileOrigin, LoopKind, NodeId, NodeKind, ProjectModel, Signature, Span, TypeRef, Usage,
    UsageKind, Visibility,
};

static JAVA: Lazy<Language> = Lazy::new(|| tree_sitter_java::LANGUAGE.into());

/// Annotation types visible without an import.
const JAVA_LANG_ANNOTATIONS: &[&str] = &[
    "Deprecated",
    "FunctionalInterface",
    "Override",
    "SafeVarargs",
    "SuppressWarnings",
];

/// Builds project models from Java sources.
pub struct JavaFrontend {
    library: GlobSet,
    markers: Vec<String>,
}

impl JavaFrontend {
    pub fn new(config: &InspectionConfig) -> Self {
        Self {
            library: config.library_matcher(),
            markers: config.markers().to_vec(),
        }
    }

    /// Read and model the given files. Paths in the model are relative to
    /// `base_dir`. Unreadable files are logged and skipped.
    pub fn load<P: AsRef<Path> + Sync>(&self, base_dir: &Path, paths: &[P]) -> ProjectModel {
        let sources: Vec<(String, String)> = paths
            .par_iter()
            .filter_map(|p| {
                let path = p.as_ref();
                match fs::read_to_string(path) {
                    Ok(text) => Some((relative_path(base_dir, path), text)),
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "failed to read source file");
                        None
                    }
                }
            })
            .collect();
        self.build(sources)
    }

    /// Model in-memory sources given as `(path, text)` pairs.
    pub fn build(&self, sources: Vec<(String, String)>) -> ProjectModel {
        let mut parsed: Vec<ParsedSource> = sources
            .into_par_iter()
            .filter_map(|(path, source)| match parse_java(&source) {
                Ok(tree) => {
                    let origin = if self.library.is_match(&path) {
                        FileOrigin::Library
                    } else {
                        FileOrigin::Project
                    };
                    Some(ParsedSource {
                        path,
                        origin,
                        source,
                        tree,
                    })
                }
                Err(e) => {
                    warn!(file = %path, error = %e, "failed to parse source file");
                    None
                }
            })
            .collect();

        // Sort by path for deterministic ordering
        parsed.sort_by(|a, b| a.path.cmp(&b.path));

        let model = ModelBuilder::new(&self.markers).build(&parsed);
        debug!(
            files = model.file_count(),
            declarations = model.declaration_count(),
            "java model built"
        );
        model
    }
}

fn relative_path(base_dir: &Path, path: &Path) -> String {
    path.strip_prefix(base_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn parse_java(source: &str) -> anyhow::Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&JAVA)?;
    parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("tree-sitter produced no tree"))
}

struct ParsedSource {
    path: String,
    origin: FileOrigin,
    source: String,
    tree: Tree,
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Source text with whitespace removed (`java.util . List` -> `java.util.List`).
fn compact_text(node: Node, source: &str) -> String {
    text(node, source).chars().filter(|c| !c.is_whitespace()).collect()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|c| kinds.contains(&c.kind()))
}

fn argument_count(node: Node) -> usize {
    node.child_by_field_name("arguments")
        .map(|a| named_children(a).len())
        .unwrap_or(0)
}

fn is_annotation(node: &Node) -> bool {
    matches!(node.kind(), "marker_annotation" | "annotation")
}

fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
            | "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
            | "annotated_type"
    )
}

/// Imports of one file.
#[derive(Debug, Default)]
struct Imports {
    /// Simple name -> qualified name
    single: HashMap<String, String>,
    /// Packages (or classes) imported with `.*`
    wildcard: Vec<String>,
    /// Statically imported member -> qualified owner class
    static_members: HashMap<String, String>,
    /// Classes imported with `import static ...*`
    static_wildcard: Vec<String>,
}

impl Imports {
    fn collect(root: Node, source: &str) -> Self {
        let mut imports = Imports::default();
        for decl in named_children(root) {
            if decl.kind() != "import_declaration" {
                continue;
            }
            let tokens = children(decl);
            let is_static = tokens.iter().any(|t| t.kind() == "static");
            let is_wildcard = tokens.iter().any(|t| t.kind() == "asterisk");
            let Some(path) = child_of_kind(decl, &["scoped_identifier", "identifier"]) else {
                continue;
            };
            let name = compact_text(path, source);

            match (is_static, is_wildcard) {
                (false, false) => {
                    let simple = name.rsplit('.').next().unwrap_or(&name).to_string();
                    imports.single.insert(simple, name);
                }
                (false, true) => imports.wildcard.push(name),
                (true, false) => {
                    if let Some((owner, member)) = name.rsplit_once('.') {
                        imports
                            .static_members
                            .insert(member.to_string(), owner.to_string());
                    }
                }
                (true, true) => imports.static_wildcard.push(name),
            }
        }
        imports
    }
}

/// Per-file state shared by the passes.
struct FileUnit<'t> {
    source: &'t str,
    tree_root: Node<'t>,
    file: FileId,
    root_node: NodeId,
    package: Option<String>,
    imports: Imports,
    /// tree-sitter node id -> model node for declarations, loops and lambdas
    structural: HashMap<usize, NodeId>,
    /// Declarations in document order with the syntax node holding their
    /// modifiers and types
    decls: Vec<(DeclId, Node<'t>)>,
    /// tree-sitter node id -> declaration for classes and callables
    decl_of: HashMap<usize, DeclId>,
}

impl<'t> FileUnit<'t> {
    /// Nearest model node enclosing a syntax node.
    fn enclosing(&self, node: Node<'t>) -> NodeId {
        let mut current = node.parent();
        while let Some(n) = current {
            if let Some(&id) = self.structural.get(&n.id()) {
                return id;
            }
            current = n.parent();
        }
        self.root_node
    }
}

struct ModelBuilder<'t> {
    model: ProjectModel,
    markers: &'t [String],
    /// Qualified name -> class-like declaration
    types: HashMap<String, DeclId>,
}

impl<'t> ModelBuilder<'t> {
    fn new(markers: &'t [String]) -> Self {
        Self {
            model: ProjectModel::new(),
            markers,
            types: HashMap::new(),
        }
    }

    fn build(mut self, parsed: &'t [ParsedSource]) -> ProjectModel {
        let mut units: Vec<FileUnit<'t>> = parsed.iter().map(|p| self.open_unit(p)).collect();

        for unit in units.iter_mut() {
            let root_node = unit.root_node;
            for child in named_children(unit.tree_root) {
                self.scan_structure(unit, child, root_node, None, false);
            }
        }

        for unit in &units {
            self.resolve_package_annotations(unit);
            for &(id, node) in &unit.decls {
                self.resolve_declaration(unit, id, node);
            }
        }

        for unit in &units {
            let mut walker = UsageWalker {
                builder: &mut self,
                unit,
                frames: Vec::new(),
            };
            walker.walk(unit.tree_root, None);
        }

        self.model
    }

    fn open_unit(&mut self, parsed: &'t ParsedSource) -> FileUnit<'t> {
        let source = parsed.source.as_str();
        let tree_root = parsed.tree.root_node();
        let package = child_of_kind(tree_root, &["package_declaration"])
            .and_then(|p| child_of_kind(p, &["scoped_identifier", "identifier"]))
            .map(|n| compact_text(n, source));

        if let Some(p) = &package {
            self.model.add_package(p);
        }
        let file = self
            .model
            .add_file(parsed.path.clone(), package.clone(), parsed.origin);
        let root_node = self
            .model
            .file(file)
            .and_then(|f| f.root)
            .unwrap_or(NodeId(0));

        FileUnit {
            source,
            tree_root,
            file,
            root_node,
            package,
            imports: Imports::collect(tree_root, source),
            structural: HashMap::new(),
            decls: Vec::new(),
            decl_of: HashMap::new(),
        }
    }

    // ---------------------------------------------------------------
    // Pass 1: structure
    // ---------------------------------------------------------------

    fn scan_structure(
        &mut self,
        unit: &mut FileUnit<'t>,
        node: Node<'t>,
        parent: NodeId,
        containing: Option<DeclId>,
        in_body: bool,
    ) {
        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration"
            | "annotation_type_declaration" | "record_declaration" => {
                let kind = match node.kind() {
                    "interface_declaration" => DeclarationKind::Interface,
                    "enum_declaration" => DeclarationKind::Enum,
                    "annotation_type_declaration" => DeclarationKind::AnnotationType,
                    "record_declaration" => DeclarationKind::Record,
                    _ => DeclarationKind::Class,
                };
                let Some(name_node) = node.child_by_field_name("name") else {
                    return;
                };
                let name = text(name_node, unit.source);
                let qualified_name = if in_body {
                    None
                } else {
                    match containing {
                        Some(outer) => self
                            .model
                            .declaration(outer)
                            .and_then(|d| d.qualified_name.as_ref())
                            .map(|q| format!("{}.{}", q, name)),
                        None => Some(match &unit.package {
                            Some(p) => format!("{}.{}", p, name),
                            None => name.to_string(),
                        }),
                    }
                };

                let mut decl = Declaration::new(name, kind, unit.file);
                decl.qualified_name = qualified_name;
                decl.containing = containing;
                let (visibility, is_static) = self.visibility(node, containing, in_body);
                decl.visibility = visibility;
                decl.is_static = is_static;

                let (id, anchor) = self.declare(unit, node, name_node, decl, parent);
                unit.structural.insert(node.id(), anchor);
                unit.decl_of.insert(node.id(), id);

                if let Some(body) = node.child_by_field_name("body") {
                    for member in named_children(body) {
                        self.scan_structure(unit, member, anchor, Some(id), false);
                    }
                }
            }
            "method_declaration"
            | "constructor_declaration"
            | "compact_constructor_declaration"
            | "annotation_type_element_declaration" => {
                let kind = match node.kind() {
                    "constructor_declaration" | "compact_constructor_declaration" => {
                        DeclarationKind::Constructor
                    }
                    _ => DeclarationKind::Method,
                };
                let Some(name_node) = node.child_by_field_name("name") else {
                    return;
                };
                let mut decl = Declaration::new(text(name_node, unit.source), kind, unit.file);
                decl.containing = containing;
                let (visibility, is_static) = self.visibility(node, containing, in_body);
                decl.visibility = visibility;
                decl.is_static = is_static;

                let (id, anchor) = self.declare(unit, node, name_node, decl, parent);
                unit.structural.insert(node.id(), anchor);
                unit.decl_of.insert(node.id(), id);

                if let Some(body) = node.child_by_field_name("body") {
                    self.scan_structure(unit, body, anchor, containing, true);
                }
            }
            "field_declaration" | "constant_declaration" => {
                let (visibility, is_static) = self.visibility(node, containing, in_body);
                let is_static = is_static || node.kind() == "constant_declaration";
                for declarator in named_children(node) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name_node) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let mut decl =
                        Declaration::new(text(name_node, unit.source), DeclarationKind::Field, unit.file);
                    decl.containing = containing;
                    decl.visibility = visibility;
                    decl.is_static = is_static;

                    let (_, anchor) = self.declare(unit, node, name_node, decl, parent);
                    unit.structural.insert(declarator.id(), anchor);
                    if let Some(value) = declarator.child_by_field_name("value") {
                        self.scan_structure(unit, value, anchor, containing, true);
                    }
                }
            }
            "enum_constant" => {
                let Some(name_node) = node.child_by_field_name("name") else {
                    return;
                };
                let mut decl =
                    Declaration::new(text(name_node, unit.source), DeclarationKind::Field, unit.file);
                decl.containing = containing;
                decl.is_static = true;
                let (_, anchor) = self.declare(unit, node, name_node, decl, parent);
                unit.structural.insert(node.id(), anchor);
                for child in named_children(node) {
                    self.scan_structure(unit, child, anchor, containing, true);
                }
            }
            "for_statement" | "enhanced_for_statement" | "while_statement" | "do_statement" => {
                let kind = match node.kind() {
                    "for_statement" => LoopKind::For,
                    "enhanced_for_statement" => LoopKind::ForEach,
                    "while_statement" => LoopKind::While,
                    _ => LoopKind::DoWhile,
                };
                let id = self.model.add_node(
                    NodeKind::Loop(kind),
                    Some(parent),
                    unit.file,
                    Some(Span::from_node(node)),
                );
                unit.structural.insert(node.id(), id);
                for child in named_children(node) {
                    self.scan_structure(unit, child, id, containing, in_body);
                }
            }
            "lambda_expression" => {
                let id = self.model.add_node(
                    NodeKind::Lambda,
                    Some(parent),
                    unit.file,
                    Some(Span::from_node(node)),
                );
                unit.structural.insert(node.id(), id);
                for child in named_children(node) {
                    self.scan_structure(unit, child, id, containing, in_body);
                }
            }
            "object_creation_expression" => {
                let body = child_of_kind(node, &["class_body"]);
                for child in named_children(node) {
                    if Some(child) != body {
                        self.scan_structure(unit, child, parent, containing, in_body);
                    }
                }
                let (Some(body), Some(type_node)) = (body, node.child_by_field_name("type")) else {
                    return;
                };

                let mut decl = Declaration::new("<anonymous>", DeclarationKind::Class, unit.file);
                decl.containing = containing;
                decl.visibility = Visibility::Private;
                let (id, anchor) = self.declare(unit, node, type_node, decl, parent);
                unit.structural.insert(body.id(), anchor);
                unit.decl_of.insert(body.id(), id);
                for member in named_children(body) {
                    self.scan_structure(unit, member, anchor, Some(id), false);
                }
            }
            "block" | "static_initializer" | "constructor_body" => {
                for child in named_children(node) {
                    self.scan_structure(unit, child, parent, containing, true);
                }
            }
            _ => {
                for child in named_children(node) {
                    self.scan_structure(unit, child, parent, containing, in_body);
                }
            }
        }
    }

    /// Register a declaration with an anchor node at `name_node`.
    fn declare(
        &mut self,
        unit: &mut FileUnit<'t>,
        syntax: Node<'t>,
        name_node: Node<'t>,
        mut decl: Declaration,
        parent: NodeId,
    ) -> (DeclId, NodeId) {
        let anchor = self.model.add_node(
            NodeKind::Declaration,
            Some(parent),
            unit.file,
            Some(Span::from_node(name_node)),
        );
        decl.anchor = Some(anchor);
        let indexed = decl
            .qualified_name
            .clone()
            .filter(|_| decl.kind.is_class_like());

        let id = self.model.add_declaration(decl);
        if let Some(q) = indexed {
            self.types.entry(q).or_insert(id);
        }
        unit.decls.push((id, syntax));
        (id, anchor)
    }

    fn visibility(
        &self,
        node: Node<'t>,
        containing: Option<DeclId>,
        in_body: bool,
    ) -> (Visibility, bool) {
        let mut visibility = None;
        let mut is_static = false;
        if let Some(modifiers) = child_of_kind(node, &["modifiers"]) {
            for token in children(modifiers) {
                match token.kind() {
                    "public" => visibility = Some(Visibility::Public),
                    "protected" => visibility = Some(Visibility::Protected),
                    "private" => visibility = Some(Visibility::Private),
                    "static" => is_static = true,
                    _ => {}
                }
            }
        }

        let in_interface = containing
            .and_then(|c| self.model.declaration(c))
            .map(|d| matches!(d.kind, DeclarationKind::Interface | DeclarationKind::AnnotationType))
            .unwrap_or(false);

        let visibility = match visibility {
            Some(v) => v,
            None if in_body => Visibility::Private,
            None if in_interface => Visibility::Public,
            None => Visibility::PackageLocal,
        };
        (visibility, is_static)
    }

    // ---------------------------------------------------------------
    // Pass 2: annotations and signatures
    // ---------------------------------------------------------------

    fn resolve_package_annotations(&mut self, unit: &FileUnit<'t>) {
        let (Some(package), Some(decl)) = (
            unit.package.as_deref(),
            child_of_kind(unit.tree_root, &["package_declaration"]),
        ) else {
            return;
        };
        let annotations: Vec<Annotation> = named_children(decl)
            .into_iter()
            .filter(is_annotation)
            .filter_map(|a| self.annotation(unit, a, None))
            .collect();
        for annotation in annotations {
            self.model.annotate_package(package, annotation);
        }
    }

    fn resolve_declaration(&mut self, unit: &FileUnit<'t>, id: DeclId, node: Node<'t>) {
        let Some(decl) = self.model.declaration(id) else {
            return;
        };
        let scope = if decl.kind.is_class_like() {
            Some(id)
        } else {
            decl.containing
        };

        let annotations: Vec<Annotation> = child_of_kind(node, &["modifiers"])
            .map(|m| {
                named_children(m)
                    .into_iter()
                    .filter(is_annotation)
                    .filter_map(|a| self.annotation(unit, a, scope))
                    .collect()
            })
            .unwrap_or_default();

        let mut signature = Signature::default();
        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration"
            | "record_declaration" => {
                for clause in named_children(node) {
                    match clause.kind() {
                        "superclass" => signature
                            .supertypes
                            .extend(named_children(clause).into_iter().filter_map(|t| self.type_ref(unit, t, scope))),
                        "super_interfaces" | "extends_interfaces" => {
                            if let Some(list) = child_of_kind(clause, &["type_list"]) {
                                signature.supertypes.extend(
                                    named_children(list)
                                        .into_iter()
                                        .filter_map(|t| self.type_ref(unit, t, scope)),
                                );
                            }
                        }
                        _ => {}
                    }
                }
            }
            "object_creation_expression" => {
                if let Some(t) = node
                    .child_by_field_name("type")
                    .and_then(|t| self.type_ref(unit, t, scope))
                {
                    signature.supertypes.push(t);
                }
            }
            "method_declaration" | "annotation_type_element_declaration" => {
                signature.return_type = node
                    .child_by_field_name("type")
                    .and_then(|t| self.type_ref(unit, t, scope));
                if let Some(params) = node.child_by_field_name("parameters") {
                    signature.parameters = self.parameter_types(unit, params, scope);
                }
            }
            "constructor_declaration" => {
                if let Some(params) = node.child_by_field_name("parameters") {
                    signature.parameters = self.parameter_types(unit, params, scope);
                }
            }
            "field_declaration" | "constant_declaration" => {
                signature.field_type = node
                    .child_by_field_name("type")
                    .and_then(|t| self.type_ref(unit, t, scope));
            }
            _ => {}
        }

        if let Some(decl) = self.model.declaration_mut(id) {
            decl.annotations = annotations;
            decl.signature = signature;
        }
    }

    fn parameter_types(&self, unit: &FileUnit<'t>, params: Node<'t>, scope: Option<DeclId>) -> Vec<TypeRef> {
        named_children(params)
            .into_iter()
            .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
            .map(|p| {
                let ty = match p.kind() {
                    "formal_parameter" => p.child_by_field_name("type"),
                    _ => named_children(p).into_iter().find(|c| is_type_node(c.kind())),
                };
                ty.and_then(|t| self.type_ref(unit, t, scope))
                    .unwrap_or_else(|| TypeRef::new(text(p, unit.source), None))
            })
            .collect()
    }

    fn annotation(&self, unit: &FileUnit<'t>, node: Node<'t>, scope: Option<DeclId>) -> Option<Annotation> {
        let name = node.child_by_field_name("name")?;
        let qualified = self.resolve_annotation_name(unit, &compact_text(name, unit.source), scope);
        let mut annotation = Annotation::new(qualified);

        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                if argument.kind() == "element_value_pair" {
                    let (Some(key), Some(value)) = (
                        argument.child_by_field_name("key"),
                        argument.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    annotation
                        .attributes
                        .insert(text(key, unit.source).to_string(), attribute_value(value, unit.source));
                } else {
                    annotation
                        .attributes
                        .insert("value".to_string(), attribute_value(argument, unit.source));
                }
            }
        }
        Some(annotation)
    }

    fn resolve_annotation_name(&self, unit: &FileUnit<'t>, written: &str, scope: Option<DeclId>) -> String {
        let (first, rest) = match written.split_once('.') {
            Some((f, r)) => (f, Some(r)),
            None => (written, None),
        };
        if let Some(q) = self.qualify_simple_name(unit, first, scope) {
            return match rest {
                Some(r) => format!("{}.{}", q, r),
                None => q,
            };
        }
        if rest.is_some() {
            return written.to_string();
        }
        for package in &unit.imports.wildcard {
            let candidate = format!("{}.{}", package, written);
            if self.markers.contains(&candidate) {
                return candidate;
            }
        }
        if JAVA_LANG_ANNOTATIONS.contains(&written) {
            return format!("java.lang.{}", written);
        }
        match &unit.package {
            Some(p) => format!("{}.{}", p, written),
            None => written.to_string(),
        }
    }

    /// Qualified name for a simple type name as seen from `scope`.
    fn qualify_simple_name(&self, unit: &FileUnit<'t>, name: &str, scope: Option<DeclId>) -> Option<String> {
        let mut current = scope;
        while let Some(id) = current {
            let Some(decl) = self.model.declaration(id) else {
                break;
            };
            if let Some(q) = &decl.qualified_name {
                if decl.name == name && decl.kind.is_class_like() {
                    return Some(q.clone());
                }
                let member = format!("{}.{}", q, name);
                if self.types.contains_key(&member) {
                    return Some(member);
                }
            }
            current = decl.containing;
        }

        if let Some(q) = unit.imports.single.get(name) {
            return Some(q.clone());
        }
        let same_package = match &unit.package {
            Some(p) => format!("{}.{}", p, name),
            None => name.to_string(),
        };
        if self.types.contains_key(&same_package) {
            return Some(same_package);
        }
        unit.imports
            .wildcard
            .iter()
            .map(|p| format!("{}.{}", p, name))
            .find(|c| self.types.contains_key(c))
    }

    /// Resolve a possibly dotted type name to a declaration in the model.
    fn resolve_type_name(&self, unit: &FileUnit<'t>, name: &str, scope: Option<DeclId>) -> Option<DeclId> {
        if let Some(&id) = self.types.get(name) {
            if name.contains('.') {
                return Some(id);
            }
        }
        let (first, rest) = match name.split_once('.') {
            Some((f, r)) => (f, Some(r)),
            None => (name, None),
        };
        let head = self.qualify_simple_name(unit, first, scope)?;
        let qualified = match rest {
            Some(r) => format!("{}.{}", head, r),
            None => head,
        };
        self.types.get(&qualified).copied()
    }

    fn type_ref(&self, unit: &FileUnit<'t>, node: Node<'t>, scope: Option<DeclId>) -> Option<TypeRef> {
        match node.kind() {
            "type_identifier" | "scoped_type_identifier" => {
                let name = compact_text(node, unit.source);
                let target = self.resolve_type_name(unit, &name, scope);
                Some(TypeRef::new(name, target))
            }
            "generic_type" => {
                let parts = named_children(node);
                let base = parts
                    .iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))?;
                let mut ty = self.type_ref(unit, *base, scope)?;
                if let Some(arguments) = parts.iter().find(|c| c.kind() == "type_arguments") {
                    ty.arguments = named_children(*arguments)
                        .into_iter()
                        .filter_map(|a| self.type_ref(unit, a, scope))
                        .collect();
                }
                Some(ty)
            }
            "array_type" => self.type_ref(unit, node.child_by_field_name("element")?, scope),
            "wildcard" | "annotated_type" => named_children(node)
                .into_iter()
                .filter(|c| !is_annotation(c))
                .last()
                .and_then(|c| self.type_ref(unit, c, scope)),
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
                Some(TypeRef::new(text(node, unit.source), None))
            }
            _ => None,
        }
    }

    // ---------------------------------------------------------------
    // Member lookup
    // ---------------------------------------------------------------

    /// Breadth-first search of `owner` and its supertypes for a member.
    fn find_in_hierarchy<F>(&self, owner: DeclId, matches: F) -> Option<DeclId>
    where
        F: Fn(&Declaration) -> bool,
    {
        let mut queue = VecDeque::from([owner]);
        let mut seen = HashSet::new();
        while let Some(ty) = queue.pop_front() {
            if !seen.insert(ty) {
                continue;
            }
            for member in self.model.members(ty) {
                if self.model.declaration(member).map(&matches).unwrap_or(false) {
                    return Some(member);
                }
            }
            if let Some(decl) = self.model.declaration(ty) {
                queue.extend(decl.signature.supertypes.iter().filter_map(|t| t.target));
            }
        }
        None
    }

    /// Member by name, preferring one whose parameter count matches.
    fn find_member(
        &self,
        owner: DeclId,
        name: &str,
        kind: DeclarationKind,
        arity: Option<usize>,
    ) -> Option<DeclId> {
        if let Some(arity) = arity {
            let exact = self.find_in_hierarchy(owner, |d| {
                d.kind == kind && d.name == name && d.arity() == arity
            });
            if exact.is_some() {
                return exact;
            }
        }
        self.find_in_hierarchy(owner, |d| d.kind == kind && d.name == name)
    }

    fn find_constructor(&self, class: DeclId, arity: Option<usize>) -> Option<DeclId> {
        let constructors: Vec<DeclId> = self
            .model
            .members(class)
            .into_iter()
            .filter(|m| {
                self.model
                    .declaration(*m)
                    .map(|d| d.kind == DeclarationKind::Constructor)
                    .unwrap_or(false)
            })
            .collect();
        arity
            .and_then(|a| {
                constructors
                    .iter()
                    .copied()
                    .find(|c| self.model.declaration(*c).map(|d| d.arity() == a).unwrap_or(false))
            })
            .or_else(|| constructors.first().copied())
    }

    /// Field visible from `scope` by simple name: enclosing classes and
    /// their supertypes first, then static imports.
    fn find_field_in_scope(&self, unit: &FileUnit<'t>, name: &str, scope: Option<DeclId>) -> Option<DeclId> {
        let mut current = scope;
        while let Some(id) = current {
            if let Some(field) = self.find_member(id, name, DeclarationKind::Field, None) {
                return Some(field);
            }
            current = self.model.declaration(id).and_then(|d| d.containing);
        }
        self.find_static_import(unit, name, DeclarationKind::Field, None)
    }

    fn find_static_import(
        &self,
        unit: &FileUnit<'t>,
        name: &str,
        kind: DeclarationKind,
        arity: Option<usize>,
    ) -> Option<DeclId> {
        let owners = unit
            .imports
            .static_members
            .get(name)
            .into_iter()
            .chain(unit.imports.static_wildcard.iter());
        for owner in owners {
            if let Some(found) = self
                .types
                .get(owner)
                .and_then(|&class| self.find_member(class, name, kind, arity))
            {
                return Some(found);
            }
        }
        None
    }
}

fn attribute_value(node: Node, source: &str) -> AttributeValue {
    match node.kind() {
        "true" => AttributeValue::Bool(true),
        "false" => AttributeValue::Bool(false),
        "decimal_integer_literal" => {
            let digits: String = text(node, source)
                .chars()
                .filter(|c| *c != '_' && *c != 'l' && *c != 'L')
                .collect();
            match digits.parse() {
                Ok(value) => AttributeValue::Int(value),
                Err(_) => AttributeValue::Expression {
                    expression: text(node, source).to_string(),
                },
            }
        }
        "string_literal" => AttributeValue::Str(text(node, source).trim_matches('"').to_string()),
        "element_value_array_initializer" => AttributeValue::List(
            named_children(node)
                .into_iter()
                .map(|v| attribute_value(v, source))
                .collect(),
        ),
        _ => AttributeValue::Expression {
            expression: text(node, source).to_string(),
        },
    }
}

/// Whether an identifier is read as a value (as opposed to naming a
/// declaration, a label, a method or a package segment).
fn is_value_identifier(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_field = |field: &str| parent.child_by_field_name(field) == Some(node);
    match parent.kind() {
        "method_invocation" => !is_field("name"),
        "field_access" => !is_field("field"),
        "variable_declarator" | "enhanced_for_statement" | "resource" => is_field("value"),
        "lambda_expression" => is_field("body"),
        "instanceof_expression" => !is_field("name"),
        "formal_parameter"
        | "spread_parameter"
        | "catch_formal_parameter"
        | "inferred_parameters"
        | "type_pattern"
        | "scoped_identifier"
        | "method_reference"
        | "labeled_statement"
        | "break_statement"
        | "continue_statement"
        | "enum_constant"
        | "element_value_pair"
        | "marker_annotation"
        | "annotation"
        | "import_declaration"
        | "package_declaration"
        | "class_declaration"
        | "interface_declaration"
        | "enum_declaration"
        | "record_declaration"
        | "annotation_type_declaration"
        | "annotation_type_element_declaration"
        | "method_declaration"
        | "constructor_declaration"
        | "compact_constructor_declaration"
        | "type_parameter" => false,
        _ => true,
    }
}

// -------------------------------------------------------------------
// Pass 3: usages
// -------------------------------------------------------------------

struct UsageWalker<'b, 't> {
    builder: &'b mut ModelBuilder<'t>,
    unit: &'b FileUnit<'t>,
    /// Local variables and parameters: name -> declared type
    frames: Vec<HashMap<String, Option<DeclId>>>,
}

impl<'b, 't> UsageWalker<'b, 't> {
    fn walk(&mut self, node: Node<'t>, scope: Option<DeclId>) {
        let scope = match self.unit.decl_of.get(&node.id()) {
            Some(&id) if self.is_class_like(id) => Some(id),
            _ => scope,
        };

        match node.kind() {
            "import_declaration" => {
                self.import(node);
                return;
            }
            "package_declaration" | "marker_annotation" | "annotation" => return,
            "method_declaration"
            | "constructor_declaration"
            | "compact_constructor_declaration"
            | "lambda_expression"
            | "static_initializer" => {
                if node.kind() == "method_declaration" {
                    self.overrides(node);
                }
                let frame = self.collect_locals(node, scope);
                self.frames.push(frame);
                for child in named_children(node) {
                    self.walk(child, scope);
                }
                self.frames.pop();
                return;
            }
            "object_creation_expression" => {
                self.object_creation(node, scope);
                let type_node = node.child_by_field_name("type");
                for child in named_children(node) {
                    if Some(child) == type_node {
                        // Type arguments of `new Box<Heavy>()` are references
                        if let Some(arguments) = child_of_kind(child, &["type_arguments"]) {
                            self.walk(arguments, scope);
                        }
                        continue;
                    }
                    self.walk(child, scope);
                }
                return;
            }
            "identifier" => {
                self.identifier(node, scope);
                return;
            }
            "type_identifier" | "scoped_type_identifier" => {
                self.type_reference(node, scope);
                return;
            }
            "method_invocation" => self.method_invocation(node, scope),
            "field_access" => self.field_access(node, scope),
            "method_reference" => self.method_reference(node, scope),
            _ => {}
        }

        for child in named_children(node) {
            self.walk(child, scope);
        }
    }

    fn is_class_like(&self, id: DeclId) -> bool {
        self.builder
            .model
            .declaration(id)
            .map(|d| d.kind.is_class_like())
            .unwrap_or(false)
    }

    fn add_usage(&mut self, at: Node<'t>, node_kind: NodeKind, kind: UsageKind, target: DeclId) {
        let parent = self.unit.enclosing(at);
        let source = self.builder.model.add_node(
            node_kind,
            Some(parent),
            self.unit.file,
            Some(Span::from_node(at)),
        );
        self.builder.model.add_usage(
            self.unit.file,
            Usage {
                kind,
                source,
                target: Some(target),
            },
        );
    }

    fn local(&self, name: &str) -> Option<Option<DeclId>> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    fn collect_locals(&self, node: Node<'t>, scope: Option<DeclId>) -> HashMap<String, Option<DeclId>> {
        let source = self.unit.source;
        let mut locals = HashMap::new();
        let declare = |name: Option<Node<'t>>, ty: Option<Node<'t>>, locals: &mut HashMap<String, Option<DeclId>>| {
            if let Some(name) = name {
                let target = ty
                    .and_then(|t| self.builder.type_ref(self.unit, t, scope))
                    .and_then(|t| t.target);
                locals.insert(text(name, source).to_string(), target);
            }
        };

        if node.kind() == "lambda_expression" {
            if let Some(params) = node.child_by_field_name("parameters") {
                if params.kind() == "identifier" {
                    locals.insert(text(params, source).to_string(), None);
                }
            }
        }

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let nested = current != node
                && matches!(
                    current.kind(),
                    "lambda_expression" | "class_body" | "method_declaration" | "constructor_declaration"
                );
            if nested {
                continue;
            }
            match current.kind() {
                "formal_parameter" | "catch_formal_parameter" | "enhanced_for_statement" | "resource" => {
                    let ty = current
                        .child_by_field_name("type")
                        .or_else(|| named_children(current).into_iter().find(|c| is_type_node(c.kind())));
                    declare(current.child_by_field_name("name"), ty, &mut locals);
                }
                "spread_parameter" => {
                    let ty = named_children(current).into_iter().find(|c| is_type_node(c.kind()));
                    let name = child_of_kind(current, &["variable_declarator"])
                        .and_then(|d| d.child_by_field_name("name"));
                    declare(name, ty, &mut locals);
                }
                "local_variable_declaration" => {
                    let ty = current.child_by_field_name("type");
                    for declarator in named_children(current) {
                        if declarator.kind() == "variable_declarator" {
                            declare(declarator.child_by_field_name("name"), ty, &mut locals);
                        }
                    }
                }
                "inferred_parameters" => {
                    for name in named_children(current) {
                        locals.insert(text(name, source).to_string(), None);
                    }
                }
                _ => {}
            }
            stack.extend(named_children(current));
        }
        locals
    }

    /// Static type of an expression, when it can be told.
    fn expression_type(&self, node: Node<'t>, scope: Option<DeclId>) -> Option<DeclId> {
        let model = &self.builder.model;
        match node.kind() {
            "identifier" => {
                let name = text(node, self.unit.source);
                if let Some(local) = self.local(name) {
                    return local;
                }
                self.builder
                    .find_field_in_scope(self.unit, name, scope)
                    .and_then(|f| model.declaration(f))
                    .and_then(|f| f.signature.field_type.as_ref())
                    .and_then(|t| t.target)
            }
            "this" => scope,
            "parenthesized_expression" => named_children(node)
                .into_iter()
                .next()
                .and_then(|inner| self.expression_type(inner, scope)),
            "cast_expression" | "object_creation_expression" => node
                .child_by_field_name("type")
                .and_then(|t| self.builder.type_ref(self.unit, t, scope))
                .and_then(|t| t.target),
            "method_invocation" => self
                .resolve_method_invocation(node, scope)
                .and_then(|m| model.declaration(m))
                .and_then(|m| m.signature.return_type.as_ref())
                .and_then(|t| t.target),
            "field_access" => self
                .resolve_field_access(node, scope)
                .and_then(|f| model.declaration(f))
                .and_then(|f| f.signature.field_type.as_ref())
                .and_then(|t| t.target),
            _ => None,
        }
    }

    /// Type a member is looked up on: an instance expression's type, or a
    /// type named directly for static access.
    fn receiver_type(&self, object: Node<'t>, scope: Option<DeclId>) -> Option<DeclId> {
        match object.kind() {
            "super" => scope
                .and_then(|s| self.builder.model.declaration(s))
                .and_then(|d| d.signature.supertypes.first())
                .and_then(|t| t.target),
            "identifier" => {
                let name = text(object, self.unit.source);
                if self.local(name).is_some()
                    || self.builder.find_field_in_scope(self.unit, name, scope).is_some()
                {
                    return self.expression_type(object, scope);
                }
                self.builder.resolve_type_name(self.unit, name, scope)
            }
            "field_access" => self.expression_type(object, scope).or_else(|| {
                self.builder
                    .resolve_type_name(self.unit, &compact_text(object, self.unit.source), scope)
            }),
            "type_identifier" | "scoped_type_identifier" | "generic_type" => self
                .builder
                .type_ref(self.unit, object, scope)
                .and_then(|t| t.target),
            _ => self.expression_type(object, scope),
        }
    }

    fn resolve_method_invocation(&self, node: Node<'t>, scope: Option<DeclId>) -> Option<DeclId> {
        let name = text(node.child_by_field_name("name")?, self.unit.source);
        let arity = Some(argument_count(node));

        if let Some(object) = node.child_by_field_name("object") {
            let owner = self.receiver_type(object, scope)?;
            return self
                .builder
                .find_member(owner, name, DeclarationKind::Method, arity);
        }

        let mut current = scope;
        while let Some(id) = current {
            if let Some(method) = self
                .builder
                .find_member(id, name, DeclarationKind::Method, arity)
            {
                return Some(method);
            }
            current = self.builder.model.declaration(id).and_then(|d| d.containing);
        }
        self.builder
            .find_static_import(self.unit, name, DeclarationKind::Method, arity)
    }

    fn resolve_field_access(&self, node: Node<'t>, scope: Option<DeclId>) -> Option<DeclId> {
        let field = text(node.child_by_field_name("field")?, self.unit.source);
        let owner = self.receiver_type(node.child_by_field_name("object")?, scope)?;
        self.builder
            .find_member(owner, field, DeclarationKind::Field, None)
    }

    fn method_invocation(&mut self, node: Node<'t>, scope: Option<DeclId>) {
        let (Some(name), Some(method)) = (
            node.child_by_field_name("name"),
            self.resolve_method_invocation(node, scope),
        ) else {
            return;
        };
        self.add_usage(name, NodeKind::Call, UsageKind::Reference, method);
    }

    fn field_access(&mut self, node: Node<'t>, scope: Option<DeclId>) {
        let (Some(name), Some(field)) = (
            node.child_by_field_name("field"),
            self.resolve_field_access(node, scope),
        ) else {
            return;
        };
        self.add_usage(name, NodeKind::Reference, UsageKind::Reference, field);
    }

    fn identifier(&mut self, node: Node<'t>, scope: Option<DeclId>) {
        if !is_value_identifier(node) {
            return;
        }
        let name = text(node, self.unit.source);
        if self.local(name).is_some() {
            return;
        }
        if let Some(field) = self.builder.find_field_in_scope(self.unit, name, scope) {
            self.add_usage(node, NodeKind::Reference, UsageKind::Reference, field);
        }
    }

    fn type_reference(&mut self, node: Node<'t>, scope: Option<DeclId>) {
        let name = compact_text(node, self.unit.source);
        if let Some(target) = self.builder.resolve_type_name(self.unit, &name, scope) {
            self.add_usage(node, NodeKind::Reference, UsageKind::Reference, target);
        }
    }

    fn object_creation(&mut self, node: Node<'t>, scope: Option<DeclId>) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let Some(class) = self
            .builder
            .type_ref(self.unit, type_node, scope)
            .and_then(|t| t.target)
        else {
            return;
        };
        // Classes without explicit constructors are targeted directly
        let target = self
            .builder
            .find_constructor(class, Some(argument_count(node)))
            .unwrap_or(class);
        self.add_usage(type_node, NodeKind::New, UsageKind::ConstructorInvocation, target);
    }

    fn method_reference(&mut self, node: Node<'t>, scope: Option<DeclId>) {
        let parts = named_children(node);
        let Some(receiver) = parts.first().copied() else {
            return;
        };
        let Some(owner) = self.receiver_type(receiver, scope) else {
            return;
        };

        if children(node).iter().any(|c| c.kind() == "new") {
            let target = self.builder.find_constructor(owner, None).unwrap_or(owner);
            self.add_usage(node, NodeKind::New, UsageKind::ConstructorInvocation, target);
            return;
        }
        let Some(name) = parts.last().copied().filter(|n| n.kind() == "identifier" && *n != receiver) else {
            return;
        };
        let method_name = text(name, self.unit.source);
        if let Some(method) = self
            .builder
            .find_member(owner, method_name, DeclarationKind::Method, None)
        {
            self.add_usage(name, NodeKind::Call, UsageKind::Reference, method);
        }
    }

    fn import(&mut self, node: Node<'t>) {
        let tokens = children(node);
        if tokens.iter().any(|t| t.kind() == "asterisk") {
            return;
        }
        let is_static = tokens.iter().any(|t| t.kind() == "static");
        let Some(path) = child_of_kind(node, &["scoped_identifier", "identifier"]) else {
            return;
        };
        let name = compact_text(path, self.unit.source);

        let target = if is_static {
            name.rsplit_once('.').and_then(|(owner, member)| {
                let class = *self.builder.types.get(owner)?;
                self.builder
                    .find_member(class, member, DeclarationKind::Method, None)
                    .or_else(|| {
                        self.builder
                            .find_member(class, member, DeclarationKind::Field, None)
                    })
                    .or_else(|| self.builder.types.get(&name).copied())
            })
        } else {
            self.builder.types.get(&name).copied()
        };

        if let Some(target) = target {
            self.add_usage(path, NodeKind::Import, UsageKind::ImportReference, target);
        }
    }

    /// Override edges of a method: the nearest matching method along each
    /// direct supertype branch.
    fn overrides(&mut self, node: Node<'t>) {
        let Some(&method) = self.unit.decl_of.get(&node.id()) else {
            return;
        };
        let model = &self.builder.model;
        let Some(decl) = model.declaration(method) else {
            return;
        };
        if decl.kind != DeclarationKind::Method
            || decl.is_static
            || decl.visibility == Visibility::Private
        {
            return;
        }
        let (Some(anchor), Some(owner)) = (decl.anchor, decl.containing) else {
            return;
        };
        let name = decl.name.clone();
        let arity = decl.arity();
        let supertypes: Vec<DeclId> = model
            .declaration(owner)
            .map(|o| o.signature.supertypes.iter().filter_map(|t| t.target).collect())
            .unwrap_or_default();

        let mut seen = HashSet::new();
        for supertype in supertypes {
            let overridden = self.builder.find_in_hierarchy(supertype, |d| {
                d.kind == DeclarationKind::Method
                    && d.name == name
                    && d.arity() == arity
                    && !d.is_static
                    && d.visibility != Visibility::Private
            });
            if let Some(overridden) = overridden.filter(|o| seen.insert(*o)) {
                self.builder.model.add_usage(
                    self.unit.file,
                    Usage {
                        kind: UsageKind::MethodOverride,
                        source: anchor,
                        target: Some(overridden),
                    },
                );
            }
        }
    }
}
