//! Resolution of marker annotations on declarations and their signatures.
//!
//! A declaration counts as expensive when it carries a marker itself, or
//! when its innermost marked container (containing class chain, then
//! package) does. Separately, a declaration may be unmarked but expose a
//! marked type through its signature.

use crate::model::{Annotation, CodeModel, DeclId, DeclarationKind, FileId, TypeRef};

/// The entity the matched annotation was found on.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatedScope {
    Declaration(DeclId),
    Package(String),
}

/// A declaration together with the marker that makes it expensive.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedContainingDeclaration {
    /// The declaration being checked.
    pub target: DeclId,
    /// Where the annotation was found.
    pub scope: AnnotatedScope,
    pub annotation: Annotation,
    /// True when the annotation sits on `target` itself.
    pub is_own_annotation: bool,
    pub target_name: String,
    pub target_type: &'static str,
    pub containing_declaration_name: String,
    pub containing_declaration_type: &'static str,
}

impl AnnotatedContainingDeclaration {
    /// Annotation name as shown to users.
    pub fn presentable_annotation_name(&self) -> &str {
        self.annotation.short_name()
    }

    fn new<M: CodeModel + ?Sized>(
        model: &M,
        target: DeclId,
        scope: AnnotatedScope,
        annotation: &Annotation,
    ) -> Option<Self> {
        let decl = model.declaration(target)?;
        let (containing_declaration_name, containing_declaration_type) = match &scope {
            AnnotatedScope::Declaration(id) => {
                let container = model.declaration(*id)?;
                (container.presentable_name(), container.kind.as_str())
            }
            AnnotatedScope::Package(name) => (name.clone(), "package"),
        };
        Some(Self {
            target,
            is_own_annotation: scope == AnnotatedScope::Declaration(target),
            scope,
            annotation: annotation.clone(),
            target_name: decl.presentable_name(),
            target_type: decl.kind.as_str(),
            containing_declaration_name,
            containing_declaration_type,
        })
    }
}

/// Find the innermost entity marked with one of `markers`.
///
/// Walks `target` itself (when `include_self`), then the containing class
/// chain outward, then the package of the declaring file. A package that
/// cannot be found in the package index counts as not annotated.
pub fn find_annotated_containing_declaration<M: CodeModel + ?Sized>(
    model: &M,
    target: DeclId,
    markers: &[String],
    include_self: bool,
) -> Option<AnnotatedContainingDeclaration> {
    let decl = model.declaration(target)?;

    let mut current = if include_self {
        Some(target)
    } else {
        decl.containing
    };
    while let Some(id) = current {
        let Some(candidate) = model.declaration(id) else {
            break;
        };
        if let Some(annotation) = candidate.find_annotation(markers) {
            return AnnotatedContainingDeclaration::new(
                model,
                target,
                AnnotatedScope::Declaration(id),
                annotation,
            );
        }
        current = candidate.containing;
    }

    let package_name = model.file(decl.file)?.package.as_deref()?;
    let package = model.package(package_name)?;
    let annotation = package.find_annotation(markers)?;
    AnnotatedContainingDeclaration::new(
        model,
        target,
        AnnotatedScope::Package(package_name.to_string()),
        annotation,
    )
}

/// Whether `decl` carries a marker directly.
fn find_own_annotation<M: CodeModel + ?Sized>(
    model: &M,
    decl: DeclId,
    markers: &[String],
) -> Option<AnnotatedContainingDeclaration> {
    let annotation = model.declaration(decl)?.find_annotation(markers)?;
    AnnotatedContainingDeclaration::new(model, decl, AnnotatedScope::Declaration(decl), annotation)
}

/// Find a marked type referenced by the signature of `declaration`.
///
/// Classes scan their supertypes, methods their return type and then their
/// parameters left to right, fields their declared type. Generic arguments
/// are scanned after the type that carries them. The first marked type
/// wins. Any other declaration kind never matches.
pub fn find_annotated_type_used_in_declaration_signature<M: CodeModel + ?Sized>(
    model: &M,
    declaration: DeclId,
    markers: &[String],
) -> Option<AnnotatedContainingDeclaration> {
    let decl = model.declaration(declaration)?;
    let signature = &decl.signature;

    let mut candidates: Box<dyn Iterator<Item = &TypeRef>> = match decl.kind {
        kind if kind.is_class_like() => Box::new(signature.supertypes.iter()),
        DeclarationKind::Method | DeclarationKind::Constructor => Box::new(
            signature
                .return_type
                .iter()
                .chain(signature.parameters.iter()),
        ),
        DeclarationKind::Field => Box::new(signature.field_type.iter()),
        _ => return None,
    };

    candidates.find_map(|ty| find_annotated_type_part(model, ty, markers))
}

fn find_annotated_type_part<M: CodeModel + ?Sized>(
    model: &M,
    ty: &TypeRef,
    markers: &[String],
) -> Option<AnnotatedContainingDeclaration> {
    if let Some(found) = ty
        .target
        .and_then(|target| find_own_annotation(model, target, markers))
    {
        return Some(found);
    }
    ty.arguments
        .iter()
        .find_map(|argument| find_annotated_type_part(model, argument, markers))
}

/// Pre-check: can any of `markers` be referenced from `file`?
pub fn can_any_annotation_be_used_in_file<M: CodeModel + ?Sized>(
    model: &M,
    markers: &[String],
    file: FileId,
) -> bool {
    markers
        .iter()
        .any(|m| model.can_annotation_be_used_in_file(m, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixture::{expensive, markers, Fixture};
    use crate::model::{Annotation, DeclarationKind, TypeRef};

    #[test]
    fn test_own_annotation() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Renderer.java", Some("lib"));
        let class = fx.class(file, None, "Renderer", vec![]);
        let method = fx.method(class, "render", vec![expensive()]);

        let found = find_annotated_containing_declaration(&fx.model, method, &markers(), true).unwrap();
        assert!(found.is_own_annotation);
        assert_eq!(found.target_name, "render()");
        assert_eq!(found.target_type, "method");
        assert_eq!(found.presentable_annotation_name(), "Expensive");
        assert_eq!(found.scope, AnnotatedScope::Declaration(method));
    }

    #[test]
    fn test_include_self_false_skips_target() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Renderer.java", None);
        let class = fx.class(file, None, "Renderer", vec![]);
        let method = fx.method(class, "render", vec![expensive()]);

        assert!(find_annotated_containing_declaration(&fx.model, method, &markers(), false).is_none());
    }

    #[test]
    fn test_innermost_container_wins() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Outer.java", Some("lib"));
        let outer = fx.class(
            file,
            None,
            "Outer",
            vec![expensive().with_attribute("calledInLoop", crate::model::AttributeValue::Bool(false))],
        );
        let inner = fx.class(file, Some(outer), "Inner", vec![expensive()]);
        let method = fx.method(inner, "compute", vec![]);

        let found = find_annotated_containing_declaration(&fx.model, method, &markers(), true).unwrap();
        assert!(!found.is_own_annotation);
        assert_eq!(found.scope, AnnotatedScope::Declaration(inner));
        assert_eq!(found.containing_declaration_type, "class");
        assert_eq!(found.containing_declaration_name, "Inner");
        // The inner class's annotation instance is the one returned
        assert!(found.annotation.attributes.is_empty());
    }

    #[test]
    fn test_package_annotation() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/slow/Api.java", Some("lib.slow"));
        fx.model.annotate_package("lib.slow", expensive());
        let class = fx.class(file, None, "Api", vec![]);
        let field = fx.field(class, "CACHE", vec![]);

        let found = find_annotated_containing_declaration(&fx.model, field, &markers(), true).unwrap();
        assert_eq!(found.scope, AnnotatedScope::Package("lib.slow".to_string()));
        assert_eq!(found.containing_declaration_type, "package");
        assert_eq!(found.containing_declaration_name, "lib.slow");
    }

    #[test]
    fn test_unresolvable_package_is_not_annotated() {
        let mut fx = Fixture::new();
        // Package never registered in the model's package index
        let file = fx
            .model
            .add_file("x/Api.java", Some("x".to_string()), crate::model::FileOrigin::Project);
        let class = fx.class(file, None, "Api", vec![]);

        assert!(find_annotated_containing_declaration(&fx.model, class, &markers(), true).is_none());
    }

    #[test]
    fn test_other_annotations_ignored() {
        let mut fx = Fixture::new();
        let file = fx.file("A.java", None);
        let class = fx.class(file, None, "A", vec![Annotation::new("java.lang.Deprecated")]);
        assert!(find_annotated_containing_declaration(&fx.model, class, &markers(), true).is_none());
    }

    #[test]
    fn test_signature_return_type_before_parameters() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Types.java", Some("lib"));
        let first = fx.class(file, None, "First", vec![expensive()]);
        let second = fx.class(file, None, "Second", vec![expensive()]);
        let api = fx.class(file, None, "Api", vec![]);
        let method = fx.method(api, "convert", vec![]);
        let param = fx.type_ref(first);
        let ret = fx.type_ref(second);
        fx.add_parameter(method, param);
        fx.set_return_type(method, ret);

        let found =
            find_annotated_type_used_in_declaration_signature(&fx.model, method, &markers()).unwrap();
        assert_eq!(found.target, second);
        assert_eq!(found.target_name, "Second");
        assert_eq!(found.target_type, "class");
    }

    #[test]
    fn test_signature_parameters_left_to_right() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Types.java", Some("lib"));
        let plain = fx.class(file, None, "Plain", vec![]);
        let first = fx.class(file, None, "First", vec![expensive()]);
        let second = fx.class(file, None, "Second", vec![expensive()]);
        let api = fx.class(file, None, "Api", vec![]);
        let method = fx.method(api, "combine", vec![]);
        let ret = fx.type_ref(plain);
        let p1 = fx.type_ref(first);
        let p2 = fx.type_ref(second);
        fx.set_return_type(method, ret);
        fx.add_parameter(method, p1);
        fx.add_parameter(method, p2);

        let found =
            find_annotated_type_used_in_declaration_signature(&fx.model, method, &markers()).unwrap();
        assert_eq!(found.target, first);
    }

    #[test]
    fn test_signature_generic_argument_and_supertype() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Types.java", Some("lib"));
        let heavy = fx.class(file, None, "Heavy", vec![expensive()]);
        let holder = fx.class(file, None, "Holder", vec![]);
        let field = fx.field(holder, "items", vec![]);
        let list = TypeRef::new("List", None).with_arguments(vec![fx.type_ref(heavy)]);
        fx.set_field_type(field, list);

        let sub = fx.class(file, None, "Sub", vec![]);
        let sup = fx.type_ref(heavy);
        fx.add_supertype(sub, sup);

        let markers = markers();
        assert_eq!(
            find_annotated_type_used_in_declaration_signature(&fx.model, field, &markers)
                .unwrap()
                .target,
            heavy
        );
        assert_eq!(
            find_annotated_type_used_in_declaration_signature(&fx.model, sub, &markers)
                .unwrap()
                .target,
            heavy
        );
    }

    #[test]
    fn test_signature_requires_direct_mark_on_type() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Types.java", Some("lib"));
        let outer = fx.class(file, None, "Outer", vec![expensive()]);
        let nested = fx.class(file, Some(outer), "Nested", vec![]);
        let api = fx.class(file, None, "Api", vec![]);
        let method = fx.method(api, "get", vec![]);
        let ret = fx.type_ref(nested);
        fx.set_return_type(method, ret);

        assert!(find_annotated_type_used_in_declaration_signature(&fx.model, method, &markers()).is_none());
    }

    #[test]
    fn test_signature_unsupported_kind() {
        let mut fx = Fixture::new();
        let file = fx.file("lib/Types.java", Some("lib"));
        let heavy = fx.class(file, None, "Heavy", vec![expensive()]);
        let api = fx.class(file, None, "Api", vec![]);
        let local = fx.declare(file, Some(api), "tmp", DeclarationKind::Variable, vec![]);
        let ty = fx.type_ref(heavy);
        fx.set_field_type(local, ty);

        assert!(find_annotated_type_used_in_declaration_signature(&fx.model, local, &markers()).is_none());
    }

    #[test]
    fn test_pre_check() {
        let mut fx = Fixture::new();
        let file = fx.file("A.java", None);
        let markers = markers();
        assert!(!can_any_annotation_be_used_in_file(&fx.model, &markers, file));

        fx.class(file, None, "A", vec![expensive()]);
        assert!(can_any_annotation_be_used_in_file(&fx.model, &markers, file));
    }
}
