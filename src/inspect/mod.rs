//! Expensive API inspections.
//!
//! Two inspections run over a [`CodeModel`](crate::model::CodeModel):
//!
//! - [`ExpensiveApiUsage`] reports references, constructor calls, imports
//!   and overrides whose target is marked with an expensive-API annotation,
//!   directly or through a containing class or package. When the target is
//!   not marked but its signature exposes a marked type, a weaker problem
//!   is reported instead.
//! - [`ExpensiveTypeUsedInSignature`] reports accessible declarations whose
//!   own signature exposes a marked type.
//!
//! The [`Runner`] applies both to every project file of a model.

pub mod bundle;
mod classifier;
pub mod messages;
mod resolver;
mod runner;
mod signature;
mod types;
mod usage;

pub use classifier::{classify_usage, ClassificationScope, UsageClassification, UsageContext, UsageFlags};
pub use messages::{
    provider_for, DefaultMessageProvider, MessageProvider, MessageProviderKind,
    ScheduledForRemovalMessageProvider, SCHEDULED_FOR_REMOVAL_ANNOTATION,
};
pub use resolver::{
    can_any_annotation_be_used_in_file, find_annotated_containing_declaration,
    find_annotated_type_used_in_declaration_signature, AnnotatedContainingDeclaration,
    AnnotatedScope,
};
pub use runner::Runner;
pub use signature::{is_accessible_declaration, ExpensiveTypeUsedInSignature};
pub use types::{
    HighlightLevel, InspectionResult, Problem, ProblemRule, ProblemSink, ProblemsHolder,
};
pub use usage::ExpensiveApiUsage;
