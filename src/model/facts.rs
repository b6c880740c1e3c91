//! Fact structures that make up a code model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Index of a source file inside a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub usize);

/// Index of a syntax node inside a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Index of a declaration inside a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub usize);

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    #[serde(default)]
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    #[serde(default)]
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    #[serde(default)]
    pub end_line: usize,
    /// End column (1-indexed).
    #[serde(default)]
    pub end_col: usize,
}

impl Span {
    /// A span covering a single position.
    pub fn at(line: usize, col: usize) -> Self {
        Self {
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
            ..Default::default()
        }
    }

    /// Create a span from a tree-sitter node.
    #[cfg(feature = "tree-sitter")]
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Loop constructs recognised by the usage classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    For,
    ForEach,
    While,
    DoWhile,
}

/// Kind of a syntax node.
///
/// The model keeps only the nodes the inspections care about; everything
/// else collapses into `Other` or is omitted, with parent links skipping
/// straight to the nearest kept ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Declaration,
    Loop(LoopKind),
    Lambda,
    Call,
    New,
    Reference,
    Import,
    Other,
}

impl NodeKind {
    pub fn is_loop(&self) -> bool {
        matches!(self, NodeKind::Loop(_))
    }
}

/// A node of the syntax tree with its parent link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub parent: Option<NodeId>,
    pub file: FileId,
    /// Range to highlight when a problem is reported on this node.
    #[serde(default)]
    pub span: Option<Span>,
}

/// Kind of declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    AnnotationType,
    Record,
    Method,
    Constructor,
    Field,
    /// Parameters and locals. Present in serialized models, never scanned.
    Variable,
}

impl DeclarationKind {
    /// Human readable kind, used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Enum => "enum",
            DeclarationKind::AnnotationType => "annotation type",
            DeclarationKind::Record => "record",
            DeclarationKind::Method => "method",
            DeclarationKind::Constructor => "constructor",
            DeclarationKind::Field => "field",
            DeclarationKind::Variable => "variable",
        }
    }

    /// Classes, interfaces, enums, annotation types and records.
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            DeclarationKind::Class
                | DeclarationKind::Interface
                | DeclarationKind::Enum
                | DeclarationKind::AnnotationType
                | DeclarationKind::Record
        )
    }

    /// Methods and constructors.
    pub fn is_callable(&self) -> bool {
        matches!(self, DeclarationKind::Method | DeclarationKind::Constructor)
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared visibility of a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    PackageLocal,
    Private,
}

/// Value of an annotation attribute as written in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttributeValue>),
    /// Anything that is not a literal (constant references, expressions).
    Expression { expression: String },
}

/// An annotation instance attached to a declaration or package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub qualified_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Annotation {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Simple name of the annotation type (`Expensive` for `asteroids.Expensive`).
    pub fn short_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// Read a boolean attribute, falling back to `default` when the
    /// attribute is absent or is not a boolean literal.
    pub fn bool_attribute(&self, name: &str, default: bool) -> bool {
        match self.attributes.get(name) {
            Some(AttributeValue::Bool(value)) => *value,
            _ => default,
        }
    }

    /// Read a string literal attribute. Non-string values read as absent.
    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(AttributeValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Find the first annotation whose qualified name is one of `markers`.
pub fn find_annotation<'a>(annotations: &'a [Annotation], markers: &[String]) -> Option<&'a Annotation> {
    annotations
        .iter()
        .find(|a| markers.iter().any(|m| *m == a.qualified_name))
}

/// A type mentioned in a signature.
///
/// Array types are stored by component type; generic arguments are kept
/// as nested references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Type name as written.
    pub name: String,
    /// The class-like declaration the name resolves to, if known.
    #[serde(default)]
    pub target: Option<DeclId>,
    #[serde(default)]
    pub arguments: Vec<TypeRef>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, target: Option<DeclId>) -> Self {
        Self {
            name: name.into(),
            target,
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<TypeRef>) -> Self {
        self.arguments = arguments;
        self
    }
}

/// Types referenced by a declaration's signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Superclass and implemented/extended interfaces, in declaration order.
    #[serde(default)]
    pub supertypes: Vec<TypeRef>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub parameters: Vec<TypeRef>,
    #[serde(default)]
    pub field_type: Option<TypeRef>,
}

/// A declaration (class, method, field, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    #[serde(default)]
    pub qualified_name: Option<String>,
    pub kind: DeclarationKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub file: FileId,
    /// Innermost enclosing class-like declaration.
    #[serde(default)]
    pub containing: Option<DeclId>,
    /// Node to highlight for the declaration itself (usually its name).
    #[serde(default)]
    pub anchor: Option<NodeId>,
    #[serde(default)]
    pub signature: Signature,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclarationKind, file: FileId) -> Self {
        Self {
            name: name.into(),
            qualified_name: None,
            kind,
            visibility: Visibility::Public,
            is_static: false,
            annotations: Vec::new(),
            file,
            containing: None,
            anchor: None,
            signature: Signature::default(),
        }
    }

    /// Name used in messages: methods get `()` appended.
    pub fn presentable_name(&self) -> String {
        if self.kind.is_callable() {
            format!("{}()", self.name)
        } else {
            self.name.clone()
        }
    }

    /// First annotation matching one of the markers.
    pub fn find_annotation(&self, markers: &[String]) -> Option<&Annotation> {
        find_annotation(&self.annotations, markers)
    }

    /// Number of declared parameters (methods and constructors).
    pub fn arity(&self) -> usize {
        self.signature.parameters.len()
    }
}

/// Where a file comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOrigin {
    /// Authored in the analysed project.
    #[default]
    Project,
    /// Part of a library dependency.
    Library,
}

/// How a usage site refers to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    Reference,
    ConstructorInvocation,
    ImportReference,
    MethodOverride,
}

/// A usage site: a node referring to a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub kind: UsageKind,
    /// Node to highlight (for overrides, the overriding method's anchor).
    pub source: NodeId,
    /// Resolved declaration; `None` when resolution failed.
    #[serde(default)]
    pub target: Option<DeclId>,
}

/// A source file of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub origin: FileOrigin,
    /// Root node of the file.
    #[serde(default)]
    pub root: Option<NodeId>,
    /// Declarations in document order.
    #[serde(default)]
    pub declarations: Vec<DeclId>,
    /// Usage sites in document order.
    #[serde(default)]
    pub usages: Vec<Usage>,
}

/// A package and the annotations declared on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Package {
    pub fn find_annotation(&self, markers: &[String]) -> Option<&Annotation> {
        find_annotation(&self.annotations, markers)
    }
}
