//! The expensive API usage inspection.
//!
//! Visits every usage site of a file (references, constructor calls,
//! import references and override edges) and reports those whose target is
//! marked expensive, or whose target's signature exposes a marked type.

use tracing::debug;

use super::classifier::{classify_usage, UsageFlags};
use super::messages::provider_for;
use super::resolver::{
    can_any_annotation_be_used_in_file, find_annotated_containing_declaration,
    find_annotated_type_used_in_declaration_signature,
};
use super::{HighlightLevel, Problem, ProblemRule, ProblemSink, UsageClassification};
use crate::config::InspectionConfig;
use crate::model::{CodeModel, DeclId, FileId, NodeId, Usage, UsageKind};

/// Location of the element a problem is attached to.
struct Highlight {
    file: String,
    line: usize,
    column: usize,
}

impl Highlight {
    fn resolve<M: CodeModel + ?Sized>(model: &M, node: NodeId) -> Option<Self> {
        let node = model.node(node)?;
        let span = node.span.as_ref()?;
        let file = model.file(node.file)?;
        Some(Self {
            file: file.path.clone(),
            line: span.start_line,
            column: span.start_col,
        })
    }

    fn into_problem(
        self,
        message: String,
        level: HighlightLevel,
        classification: Option<UsageClassification>,
    ) -> Problem {
        Problem {
            rule: ProblemRule::ExpensiveApiUsage,
            message,
            file: self.file,
            line: self.line,
            column: self.column,
            level,
            classification,
        }
    }
}

/// Reports usages of expensive APIs in one file at a time.
pub struct ExpensiveApiUsage<'a> {
    config: &'a InspectionConfig,
}

impl<'a> ExpensiveApiUsage<'a> {
    pub fn new(config: &'a InspectionConfig) -> Self {
        Self { config }
    }

    /// Inspect every usage site of `file`.
    ///
    /// Returns `false` when the file was skipped because none of the marker
    /// annotations can be referenced from it.
    pub fn check_file<M, S>(&self, model: &M, file: FileId, sink: &mut S) -> bool
    where
        M: CodeModel + ?Sized,
        S: ProblemSink + ?Sized,
    {
        let markers = self.config.markers();
        if !can_any_annotation_be_used_in_file(model, markers, file) {
            return false;
        }

        for usage in model.usages(file) {
            self.check_usage(model, file, usage, sink);
        }
        true
    }

    fn check_usage<M, S>(&self, model: &M, file: FileId, usage: &Usage, sink: &mut S)
    where
        M: CodeModel + ?Sized,
        S: ProblemSink + ?Sized,
    {
        if usage.kind == UsageKind::ImportReference && self.config.ignore_inside_imports {
            return;
        }
        let Some(target) = usage.target else {
            debug!(node = usage.source.0, "unresolved usage target");
            return;
        };
        if self.config.ignore_api_declared_in_this_project && !model.is_library_declaration(target) {
            return;
        }

        let is_method_overriding = usage.kind == UsageKind::MethodOverride;
        if self.check_target_is_expensive_itself(model, target, usage.source, is_method_overriding, sink) {
            return;
        }
        if !is_method_overriding {
            self.check_target_references_expensive_type_in_signature(
                model,
                file,
                target,
                usage.source,
                sink,
            );
        }
    }

    /// Returns `true` when the target is marked, whether or not the usage
    /// ended up reported.
    fn check_target_is_expensive_itself<M, S>(
        &self,
        model: &M,
        target: DeclId,
        source: NodeId,
        is_method_overriding: bool,
        sink: &mut S,
    ) -> bool
    where
        M: CodeModel + ?Sized,
        S: ProblemSink + ?Sized,
    {
        let markers = self.config.markers();
        let Some(annotated) = find_annotated_containing_declaration(model, target, markers, true) else {
            return false;
        };

        let flags = UsageFlags::from_annotation(&annotated.annotation);
        let Some(classification) =
            classify_usage(model, source, flags, self.config.classification_scope)
        else {
            return true;
        };

        let provider = provider_for(&annotated.annotation);
        let message = if is_method_overriding {
            provider.build_message_expensive_method_overridden(&annotated)
        } else {
            provider.build_message(&annotated, classification)
        };
        let Some(highlight) = Highlight::resolve(model, source) else {
            return false;
        };

        debug!(
            file = %highlight.file,
            line = highlight.line,
            classification = %classification,
            "expensive api usage"
        );
        sink.register_problem(highlight.into_problem(
            message,
            provider.highlight_level(Some(classification)),
            Some(classification),
        ));
        true
    }

    fn check_target_references_expensive_type_in_signature<M, S>(
        &self,
        model: &M,
        file: FileId,
        target: DeclId,
        source: NodeId,
        sink: &mut S,
    ) where
        M: CodeModel + ?Sized,
        S: ProblemSink + ?Sized,
    {
        let Some(declaration) = model.declaration(target) else {
            return;
        };
        if declaration.file == file {
            return;
        }
        let Some(used) =
            find_annotated_type_used_in_declaration_signature(model, target, self.config.markers())
        else {
            return;
        };

        let provider = provider_for(&used.annotation);
        let message =
            provider.build_message_expensive_type_in_signature(&declaration.presentable_name(), &used);
        let Some(highlight) = Highlight::resolve(model, source) else {
            return;
        };

        debug!(file = %highlight.file, line = highlight.line, "expensive type in referenced signature");
        sink.register_problem(highlight.into_problem(message, provider.highlight_level(None), None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{ProblemsHolder, SCHEDULED_FOR_REMOVAL_ANNOTATION};
    use crate::model::fixture::{expensive, Fixture};
    use crate::model::{Annotation, AttributeValue, LoopKind, NodeKind};

    struct Scenario {
        fx: Fixture,
        lib: FileId,
        app: FileId,
        /// Anchor of the method body in the app file
        body: NodeId,
    }

    /// A library file plus an app file with one class and method.
    fn scenario() -> Scenario {
        let mut fx = Fixture::new();
        let lib = fx.library_file("lib/Renderer.java", Some("lib"));
        let app = fx.file("app/App.java", Some("app"));
        let app_class = fx.class(app, None, "App", vec![]);
        let main = fx.method(app_class, "main", vec![]);
        let body = fx.anchor(main);
        Scenario { fx, lib, app, body }
    }

    fn run(fx: &Fixture, file: FileId, config: &InspectionConfig) -> Vec<Problem> {
        let mut holder = ProblemsHolder::new();
        ExpensiveApiUsage::new(config).check_file(&fx.model, file, &mut holder);
        holder.into_problems()
    }

    #[test]
    fn test_own_annotation_reported_once() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![]);
        let render = s.fx.method(class, "render", vec![expensive()]);
        s.fx.call(s.app, s.body, render);

        let problems = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "'render()' is marked expensive with @Expensive");
        assert_eq!(problems[0].level, HighlightLevel::WeakWarning);
        assert_eq!(problems[0].classification, Some(UsageClassification::SingleCall));
        assert_eq!(problems[0].file, "app/App.java");
    }

    #[test]
    fn test_inherited_annotation_names_container() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![expensive()]);
        let render = s.fx.method(class, "render", vec![]);
        s.fx.call(s.app, s.body, render);

        let problems = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].message,
            "'render()' is declared in class 'Renderer' marked expensive with @Expensive"
        );
    }

    #[test]
    fn test_package_annotation_names_package() {
        let mut s = scenario();
        s.fx.model.annotate_package("lib", expensive());
        let class = s.fx.class(s.lib, None, "Renderer", vec![]);
        let render = s.fx.method(class, "render", vec![]);
        s.fx.call(s.app, s.body, render);

        let problems = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].message,
            "'render()' is declared in package 'lib' marked expensive with @Expensive"
        );
    }

    #[test]
    fn test_loop_precedes_single_call() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![]);
        let render = s.fx.method(class, "render", vec![expensive()]);
        let looping = s.fx.node(s.app, s.body, NodeKind::Loop(LoopKind::ForEach));
        s.fx.call(s.app, looping, render);

        let problems = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].classification, Some(UsageClassification::Loop));
        assert_eq!(problems[0].level, HighlightLevel::GenericErrorOrWarning);
        assert!(problems[0].message.ends_with("inside a loop"));
    }

    #[test]
    fn test_lambda_when_loop_disabled() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![]);
        let annotation = expensive().with_attribute("calledInLoop", AttributeValue::Bool(false));
        let render = s.fx.method(class, "render", vec![annotation]);
        let looping = s.fx.node(s.app, s.body, NodeKind::Loop(LoopKind::For));
        let lambda = s.fx.node(s.app, looping, NodeKind::Lambda);
        s.fx.call(s.app, lambda, render);

        let problems = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].classification, Some(UsageClassification::Lambda));
    }

    #[test]
    fn test_all_flags_disabled_reports_nothing() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![]);
        let annotation = expensive()
            .with_attribute("singleCall", AttributeValue::Bool(false))
            .with_attribute("calledInLoop", AttributeValue::Bool(false))
            .with_attribute("calledInLambda", AttributeValue::Bool(false));
        let render = s.fx.method(class, "render", vec![annotation]);
        // Signature exposes a marked type, which must not be reported either
        let heavy = s.fx.class(s.lib, None, "Heavy", vec![expensive()]);
        let ret = s.fx.type_ref(heavy);
        s.fx.set_return_type(render, ret);
        let looping = s.fx.node(s.app, s.body, NodeKind::Loop(LoopKind::While));
        s.fx.call(s.app, looping, render);

        assert!(run(&s.fx, s.app, &InspectionConfig::default()).is_empty());
    }

    #[test]
    fn test_override_message_at_overriding_method() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![]);
        let render = s.fx.method(class, "render", vec![expensive()]);
        let sub = s.fx.class(s.app, None, "FastRenderer", vec![]);
        let overriding = s.fx.method(sub, "render", vec![]);
        s.fx.override_edge(overriding, render);
        s.fx.call(s.app, s.body, render);

        let problems = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(problems.len(), 2);
        assert_eq!(
            problems[0].message,
            "Overridden method 'render()' is marked expensive with @Expensive"
        );
        let anchor_line = s
            .fx
            .model
            .node(s.fx.anchor(overriding))
            .and_then(|n| n.span.clone())
            .unwrap()
            .start_line;
        assert_eq!(problems[0].line, anchor_line);
        assert_ne!(problems[0].message, problems[1].message);
    }

    #[test]
    fn test_signature_type_reported_from_other_file_only() {
        let mut s = scenario();
        let heavy = s.fx.class(s.lib, None, "Heavy", vec![expensive()]);
        let factory = s.fx.class(s.lib, None, "Factory", vec![]);
        let create = s.fx.method(factory, "create", vec![]);
        let ret = s.fx.type_ref(heavy);
        s.fx.set_return_type(create, ret);

        s.fx.call(s.app, s.body, create);
        let problems = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].message,
            "'create()' references expensive class 'Heavy' marked with @Expensive in its signature"
        );
        assert_eq!(problems[0].classification, None);

        // Same-file reference is exempt
        let lib_user = s.fx.method(factory, "warmUp", vec![]);
        let lib_body = s.fx.anchor(lib_user);
        s.fx.call(s.lib, lib_body, create);
        assert!(run(&s.fx, s.lib, &InspectionConfig::default()).is_empty());
    }

    #[test]
    fn test_override_skips_signature_check() {
        let mut s = scenario();
        let heavy = s.fx.class(s.lib, None, "Heavy", vec![expensive()]);
        let factory = s.fx.class(s.lib, None, "Factory", vec![]);
        let create = s.fx.method(factory, "create", vec![]);
        let ret = s.fx.type_ref(heavy);
        s.fx.set_return_type(create, ret);
        let sub = s.fx.class(s.app, None, "CustomFactory", vec![]);
        let overriding = s.fx.method(sub, "create", vec![]);
        s.fx.override_edge(overriding, create);

        assert!(run(&s.fx, s.app, &InspectionConfig::default()).is_empty());
    }

    #[test]
    fn test_ignore_inside_imports_only_affects_imports() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![expensive()]);
        let root = s.fx.root(s.app);
        s.fx.usage(s.app, root, UsageKind::ImportReference, Some(class));
        s.fx.usage(s.app, s.body, UsageKind::ConstructorInvocation, Some(class));

        let all = run(&s.fx, s.app, &InspectionConfig::default());
        assert_eq!(all.len(), 2);

        let config = InspectionConfig {
            ignore_inside_imports: true,
            ..Default::default()
        };
        let filtered = run(&s.fx, s.app, &config);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0], all[1]);
    }

    #[test]
    fn test_ignore_api_declared_in_this_project() {
        let mut s = scenario();
        let local = s.fx.class(s.app, None, "LocalCache", vec![expensive()]);
        let lib_class = s.fx.class(s.lib, None, "Renderer", vec![expensive()]);
        s.fx.usage(s.app, s.body, UsageKind::ConstructorInvocation, Some(local));
        s.fx.usage(s.app, s.body, UsageKind::ConstructorInvocation, Some(lib_class));

        let config = InspectionConfig {
            ignore_api_declared_in_this_project: true,
            ..Default::default()
        };
        let problems = run(&s.fx, s.app, &config);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("'Renderer'"));
    }

    #[test]
    fn test_unresolved_and_unhighlightable_usages_skipped() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![expensive()]);
        s.fx.usage(s.app, s.body, UsageKind::Reference, None);
        let node = s.fx.model.add_node(NodeKind::Call, Some(s.body), s.app, None);
        s.fx.model.add_usage(
            s.app,
            Usage {
                kind: UsageKind::Reference,
                source: node,
                target: Some(class),
            },
        );

        assert!(run(&s.fx, s.app, &InspectionConfig::default()).is_empty());
    }

    #[test]
    fn test_scheduled_for_removal_reported_as_error() {
        let mut s = scenario();
        let marker = || Annotation::new(SCHEDULED_FOR_REMOVAL_ANNOTATION);
        let store = s.fx.class(s.lib, None, "LegacyStore", vec![]);
        let flush = s.fx.method(
            store,
            "flush",
            vec![marker().with_attribute("inVersion", AttributeValue::Str("3.0".to_string()))],
        );
        let cache = s.fx.class(s.lib, None, "LegacyCache", vec![marker()]);
        let get = s.fx.method(cache, "get", vec![]);
        let looping = s.fx.node(s.app, s.body, NodeKind::Loop(LoopKind::For));
        s.fx.call(s.app, looping, flush);
        s.fx.call(s.app, s.body, get);

        let mut config = InspectionConfig::default();
        config.expensive_api_annotations.insert(SCHEDULED_FOR_REMOVAL_ANNOTATION);
        let problems = run(&s.fx, s.app, &config);

        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].message, "'flush()' is scheduled for removal in version 3.0");
        assert_eq!(problems[0].classification, Some(UsageClassification::Loop));
        assert_eq!(
            problems[1].message,
            "'get()' is declared in class 'LegacyCache' which is scheduled for removal in a future version"
        );
        assert!(problems.iter().all(|p| p.level == HighlightLevel::GenericError));
    }

    #[test]
    fn test_pre_check_skips_file() {
        let mut fx = Fixture::new();
        let app = fx.file("App.java", None);
        fx.class(app, None, "App", vec![]);
        let mut holder = ProblemsHolder::new();
        let config = InspectionConfig::default();
        assert!(!ExpensiveApiUsage::new(&config).check_file(&fx.model, app, &mut holder));
        assert!(holder.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let mut s = scenario();
        let class = s.fx.class(s.lib, None, "Renderer", vec![expensive()]);
        let render = s.fx.method(class, "render", vec![]);
        let looping = s.fx.node(s.app, s.body, NodeKind::Loop(LoopKind::DoWhile));
        s.fx.call(s.app, looping, render);
        s.fx.call(s.app, s.body, render);

        let config = InspectionConfig::default();
        let first = run(&s.fx, s.app, &config);
        let second = run(&s.fx, s.app, &config);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }
}
