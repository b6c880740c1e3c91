//! Usage context classification: plain call, inside a loop, inside a lambda.

use serde::{Deserialize, Serialize};

use crate::model::{ancestors, Annotation, CodeModel, NodeId, NodeKind};

/// Syntactic context of a usage site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageClassification {
    SingleCall,
    Loop,
    Lambda,
}

impl UsageClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageClassification::SingleCall => "single_call",
            UsageClassification::Loop => "loop",
            UsageClassification::Lambda => "lambda",
        }
    }
}

impl std::fmt::Display for UsageClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How far up the tree the context walk goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationScope {
    /// Walk every ancestor up to the file root. A usage in a nested class
    /// declared inside an outer loop counts as "in a loop".
    #[default]
    File,
    /// Stop at the first enclosing declaration.
    Declaration,
}

/// Which classifications a marker annotation wants reported.
///
/// Read from the annotation instance found on the target; every flag
/// defaults to `true` when absent or not a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageFlags {
    pub single_call: bool,
    pub called_in_loop: bool,
    pub called_in_lambda: bool,
}

impl Default for UsageFlags {
    fn default() -> Self {
        Self {
            single_call: true,
            called_in_loop: true,
            called_in_lambda: true,
        }
    }
}

impl UsageFlags {
    pub fn from_annotation(annotation: &Annotation) -> Self {
        Self {
            single_call: annotation.bool_attribute("singleCall", true),
            called_in_loop: annotation.bool_attribute("calledInLoop", true),
            called_in_lambda: annotation.bool_attribute("calledInLambda", true),
        }
    }
}

/// Loop/lambda ancestry of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageContext {
    pub in_loop: bool,
    pub in_lambda: bool,
}

impl UsageContext {
    /// Walk the ancestors of `node` and note loop and lambda constructs.
    pub fn collect<M: CodeModel + ?Sized>(model: &M, node: NodeId, scope: ClassificationScope) -> Self {
        let mut context = UsageContext::default();
        for (_, ancestor) in ancestors(model, node) {
            match ancestor.kind {
                NodeKind::Loop(_) => context.in_loop = true,
                NodeKind::Lambda => context.in_lambda = true,
                NodeKind::Declaration if scope == ClassificationScope::Declaration => break,
                NodeKind::File => break,
                _ => {}
            }
        }
        context
    }
}

/// Classify a usage site.
///
/// Loop is checked first, then lambda, then single call; the first
/// category that is both enabled and applicable wins. `None` means the
/// usage must not be reported.
pub fn classify_usage<M: CodeModel + ?Sized>(
    model: &M,
    node: NodeId,
    flags: UsageFlags,
    scope: ClassificationScope,
) -> Option<UsageClassification> {
    let context = UsageContext::collect(model, node, scope);

    if flags.called_in_loop && context.in_loop {
        return Some(UsageClassification::Loop);
    }
    if flags.called_in_lambda && context.in_lambda {
        return Some(UsageClassification::Lambda);
    }
    if flags.single_call {
        return Some(UsageClassification::SingleCall);
    }
    None
}
