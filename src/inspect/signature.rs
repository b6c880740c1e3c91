//! The expensive type used in signature inspection.
//!
//! Reports accessible classes, methods and fields that reference a marked
//! type in their signature without being marked themselves. Changing the
//! marked type changes such a signature too, so the declaration should carry
//! the marker as well.

use tracing::debug;

use super::bundle;
use super::resolver::{
    can_any_annotation_be_used_in_file, find_annotated_containing_declaration,
    find_annotated_type_used_in_declaration_signature,
};
use super::{HighlightLevel, Problem, ProblemRule, ProblemSink};
use crate::model::{CodeModel, DeclId, Declaration, DeclarationKind, FileId, Visibility};

/// Reports declarations of one file whose signatures expose marked types.
pub struct ExpensiveTypeUsedInSignature<'a> {
    markers: &'a [String],
}

impl<'a> ExpensiveTypeUsedInSignature<'a> {
    pub fn new(markers: &'a [String]) -> Self {
        Self { markers }
    }

    /// Inspect every class, method and field declared in `file`.
    ///
    /// Returns `false` when the file was skipped by the pre-check.
    pub fn check_file<M, S>(&self, model: &M, file: FileId, sink: &mut S) -> bool
    where
        M: CodeModel + ?Sized,
        S: ProblemSink + ?Sized,
    {
        if !can_any_annotation_be_used_in_file(model, self.markers, file) {
            return false;
        }
        for &decl in model.declarations_in(file) {
            self.check_declaration(model, decl, sink);
        }
        true
    }

    fn check_declaration<M, S>(&self, model: &M, id: DeclId, sink: &mut S)
    where
        M: CodeModel + ?Sized,
        S: ProblemSink + ?Sized,
    {
        let Some(decl) = model.declaration(id) else {
            return;
        };
        if decl.kind == DeclarationKind::Variable {
            return;
        }
        if !is_accessible_declaration(model, id)
            || find_annotated_containing_declaration(model, id, self.markers, true).is_some()
        {
            return;
        }
        let Some(used) = find_annotated_type_used_in_declaration_signature(model, id, self.markers)
        else {
            return;
        };

        let Some(node) = decl.anchor.and_then(|a| model.node(a)) else {
            return;
        };
        let Some(span) = node.span.as_ref() else {
            return;
        };
        let Some(type_name) = model
            .declaration(used.target)
            .and_then(|t| t.qualified_name.as_deref())
        else {
            return;
        };
        let Some(file) = model.file(decl.file) else {
            return;
        };

        let key = match decl.kind {
            DeclarationKind::Method | DeclarationKind::Constructor => {
                "expensive.type.used.in.method.signature.description"
            }
            DeclarationKind::Field => "expensive.type.used.in.field.signature.description",
            _ => "expensive.type.used.in.class.signature.description",
        };
        let message = bundle::message(key, &[used.annotation.qualified_name.as_str(), type_name]);

        debug!(file = %file.path, line = span.start_line, declaration = %decl.name, "expensive type in signature");
        sink.register_problem(Problem {
            rule: ProblemRule::ExpensiveTypeInSignature,
            message,
            file: file.path.clone(),
            line: span.start_line,
            column: span.start_col,
            level: HighlightLevel::GenericErrorOrWarning,
            classification: None,
        });
    }
}

/// Whether a declaration and all of its containers are visible outside
/// their package.
///
/// A private or package-local field still counts when it has an accessible
/// getter or setter.
pub fn is_accessible_declaration<M: CodeModel + ?Sized>(model: &M, id: DeclId) -> bool {
    let mut current = Some(id);
    while let Some(id) = current {
        let Some(decl) = model.declaration(id) else {
            return false;
        };
        if matches!(decl.visibility, Visibility::Private | Visibility::PackageLocal) {
            return decl.kind == DeclarationKind::Field
                && field_accessors(model, decl)
                    .into_iter()
                    .any(|accessor| is_accessible_declaration(model, accessor));
        }
        current = decl.containing;
    }
    true
}

/// Getter and setter methods of a field, looked up by naming convention.
fn field_accessors<M: CodeModel + ?Sized>(model: &M, field: &Declaration) -> Vec<DeclId> {
    let Some(owner) = field.containing else {
        return Vec::new();
    };
    let property = capitalize(&field.name);
    let is_boolean = field
        .signature
        .field_type
        .as_ref()
        .map(|t| t.name == "boolean")
        .unwrap_or(false);

    model
        .members(owner)
        .into_iter()
        .filter(|member| {
            let Some(m) = model.declaration(*member) else {
                return false;
            };
            if m.kind != DeclarationKind::Method || m.is_static != field.is_static {
                return false;
            }
            let getter = m.arity() == 0
                && (m.name == format!("get{}", property)
                    || (is_boolean && m.name == format!("is{}", property)));
            let setter = m.arity() == 1 && m.name == format!("set{}", property);
            getter || setter
        })
        .collect()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
