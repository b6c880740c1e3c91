//! Language-agnostic code model.
//!
//! The inspections never look at source text. They consume a resolved
//! tree of files, nodes and declarations through the [`CodeModel`] trait:
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Java sources │────▶│ Frontend     │────▶│ ProjectModel  │
//! └──────────────┘     │ (tree-sitter)│     │ (files, nodes,│
//!                      └──────────────┘     │  declarations)│
//! ┌──────────────┐                          └───────────────┘
//! │ model.json   │──────────────────────────────────▲ │
//! └──────────────┘                                    ▼
//!                                          ┌───────────────┐
//!                                          │ Inspections   │
//!                                          └───────────────┘
//! ```
//!
//! Nodes carry parent links so context checks (inside a loop, inside a
//! lambda) are plain iterative walks. Declarations carry their annotations,
//! containing declaration and signature types.

mod facts;
#[cfg(test)]
pub(crate) mod fixture;
mod project;
mod traits;

pub use facts::{
    find_annotation, Annotation, AttributeValue, DeclId, Declaration, DeclarationKind, FileId,
    FileOrigin, LoopKind, Node, NodeId, NodeKind, Package, Signature, SourceFile, Span, TypeRef,
    Usage, UsageKind, Visibility,
};
pub use project::{ModelError, ProjectModel};
pub use traits::{ancestors, Ancestors, CodeModel};
