//! Message and severity selection.
//!
//! Each marker annotation maps to a message provider through a static
//! table keyed by the annotation's qualified name. Markers without an
//! entry use [`DefaultMessageProvider`].

use phf::phf_map;

use super::bundle;
use super::resolver::AnnotatedContainingDeclaration;
use super::{HighlightLevel, UsageClassification};
use crate::model::Annotation;

/// Qualified name of the deprecation-style marker with version metadata.
pub const SCHEDULED_FOR_REMOVAL_ANNOTATION: &str = "org.jetbrains.annotations.ApiStatus.ScheduledForRemoval";

/// Builds the text and level of a problem for one family of markers.
pub trait MessageProvider: Sync {
    /// Level for a usage of a marked API. `None` is the signature shape.
    fn highlight_level(&self, classification: Option<UsageClassification>) -> HighlightLevel;

    /// Target is marked, itself or through a container.
    fn build_message(
        &self,
        annotated: &AnnotatedContainingDeclaration,
        classification: UsageClassification,
    ) -> String;

    /// Overriding method of a marked method.
    fn build_message_expensive_method_overridden(
        &self,
        annotated: &AnnotatedContainingDeclaration,
    ) -> String;

    /// Target is unmarked but its signature references a marked type.
    fn build_message_expensive_type_in_signature(
        &self,
        referenced_api: &str,
        used_in_signature: &AnnotatedContainingDeclaration,
    ) -> String;
}

/// Tags of the known providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageProviderKind {
    Default,
    ScheduledForRemoval,
}

static KNOWN_PROVIDERS: phf::Map<&'static str, MessageProviderKind> = phf_map! {
    "org.jetbrains.annotations.ApiStatus.ScheduledForRemoval" => MessageProviderKind::ScheduledForRemoval,
};

impl MessageProviderKind {
    pub fn for_annotation(qualified_name: &str) -> Self {
        KNOWN_PROVIDERS
            .get(qualified_name)
            .copied()
            .unwrap_or(MessageProviderKind::Default)
    }

    pub fn provider(self) -> &'static dyn MessageProvider {
        match self {
            MessageProviderKind::Default => &DefaultMessageProvider,
            MessageProviderKind::ScheduledForRemoval => &ScheduledForRemovalMessageProvider,
        }
    }
}

/// Provider for the matched annotation.
pub fn provider_for(annotation: &Annotation) -> &'static dyn MessageProvider {
    MessageProviderKind::for_annotation(&annotation.qualified_name).provider()
}

/// Generic "expensive" phrasing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessageProvider;

impl MessageProvider for DefaultMessageProvider {
    fn highlight_level(&self, classification: Option<UsageClassification>) -> HighlightLevel {
        match classification {
            Some(UsageClassification::Loop) | Some(UsageClassification::Lambda) => {
                HighlightLevel::GenericErrorOrWarning
            }
            Some(UsageClassification::SingleCall) | None => HighlightLevel::WeakWarning,
        }
    }

    fn build_message(
        &self,
        annotated: &AnnotatedContainingDeclaration,
        classification: UsageClassification,
    ) -> String {
        let base = if annotated.is_own_annotation {
            "expensive.api.usage.api.is.marked.expensive.itself"
        } else {
            "expensive.api.usage.api.is.declared.in.expensive.api"
        };
        let key = match classification {
            UsageClassification::SingleCall => base.to_string(),
            UsageClassification::Loop => format!("{}.in.loop", base),
            UsageClassification::Lambda => format!("{}.in.lambda", base),
        };

        if annotated.is_own_annotation {
            bundle::message(
                &key,
                &[annotated.target_name.as_str(), annotated.presentable_annotation_name()],
            )
        } else {
            bundle::message(
                &key,
                &[
                    annotated.target_name.as_str(),
                    annotated.containing_declaration_type,
                    annotated.containing_declaration_name.as_str(),
                    annotated.presentable_annotation_name(),
                ],
            )
        }
    }

    fn build_message_expensive_method_overridden(
        &self,
        annotated: &AnnotatedContainingDeclaration,
    ) -> String {
        if annotated.is_own_annotation {
            bundle::message(
                "expensive.api.usage.overridden.method.is.marked.expensive.itself",
                &[annotated.target_name.as_str(), annotated.presentable_annotation_name()],
            )
        } else {
            bundle::message(
                "expensive.api.usage.overridden.method.is.declared.in.expensive.api",
                &[
                    annotated.target_name.as_str(),
                    annotated.containing_declaration_type,
                    annotated.containing_declaration_name.as_str(),
                    annotated.presentable_annotation_name(),
                ],
            )
        }
    }

    fn build_message_expensive_type_in_signature(
        &self,
        referenced_api: &str,
        used_in_signature: &AnnotatedContainingDeclaration,
    ) -> String {
        bundle::message(
            "expensive.api.usage.expensive.type.is.used.in.signature.of.referenced.api",
            &[
                referenced_api,
                used_in_signature.target_type,
                used_in_signature.target_name.as_str(),
                used_in_signature.presentable_annotation_name(),
            ],
        )
    }
}

/// Version-aware phrasing for APIs scheduled for removal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduledForRemovalMessageProvider;

impl ScheduledForRemovalMessageProvider {
    fn version_message(annotated: &AnnotatedContainingDeclaration) -> String {
        match annotated.annotation.string_attribute("inVersion") {
            Some(version) if !version.is_empty() => {
                bundle::message("scheduled.for.removal.predefined.version", &[version])
            }
            _ => bundle::message("scheduled.for.removal.future.version", &[]),
        }
    }
}

impl MessageProvider for ScheduledForRemovalMessageProvider {
    fn highlight_level(&self, _classification: Option<UsageClassification>) -> HighlightLevel {
        HighlightLevel::GenericError
    }

    fn build_message(
        &self,
        annotated: &AnnotatedContainingDeclaration,
        _classification: UsageClassification,
    ) -> String {
        let version = Self::version_message(annotated);
        if annotated.is_own_annotation {
            bundle::message(
                "scheduled.for.removal.api.is.marked.itself",
                &[annotated.target_name.as_str(), version.as_str()],
            )
        } else {
            bundle::message(
                "scheduled.for.removal.api.is.declared.in.marked.api",
                &[
                    annotated.target_name.as_str(),
                    annotated.containing_declaration_type,
                    annotated.containing_declaration_name.as_str(),
                    version.as_str(),
                ],
            )
        }
    }

    fn build_message_expensive_method_overridden(
        &self,
        annotated: &AnnotatedContainingDeclaration,
    ) -> String {
        let version = Self::version_message(annotated);
        if annotated.is_own_annotation {
            bundle::message(
                "scheduled.for.removal.method.overridden.marked.itself",
                &[annotated.target_name.as_str(), version.as_str()],
            )
        } else {
            bundle::message(
                "scheduled.for.removal.method.overridden.declared.in.marked.api",
                &[
                    annotated.target_name.as_str(),
                    annotated.containing_declaration_type,
                    annotated.containing_declaration_name.as_str(),
                    version.as_str(),
                ],
            )
        }
    }

    fn build_message_expensive_type_in_signature(
        &self,
        referenced_api: &str,
        used_in_signature: &AnnotatedContainingDeclaration,
    ) -> String {
        let version = Self::version_message(used_in_signature);
        bundle::message(
            "scheduled.for.removal.type.is.used.in.signature.of.referenced.api",
            &[
                referenced_api,
                used_in_signature.target_type,
                used_in_signature.target_name.as_str(),
                version.as_str(),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::resolver::AnnotatedScope;
    use crate::model::{AttributeValue, DeclId};

    fn annotated(annotation: Annotation, own: bool) -> AnnotatedContainingDeclaration {
        AnnotatedContainingDeclaration {
            target: DeclId(1),
            scope: if own {
                AnnotatedScope::Declaration(DeclId(1))
            } else {
                AnnotatedScope::Declaration(DeclId(0))
            },
            annotation,
            is_own_annotation: own,
            target_name: "render()".to_string(),
            target_type: "method",
            containing_declaration_name: "Renderer".to_string(),
            containing_declaration_type: "class",
        }
    }

    #[test]
    fn test_provider_lookup() {
        assert_eq!(
            MessageProviderKind::for_annotation(SCHEDULED_FOR_REMOVAL_ANNOTATION),
            MessageProviderKind::ScheduledForRemoval
        );
        assert_eq!(
            MessageProviderKind::for_annotation("asteroids.Expensive"),
            MessageProviderKind::Default
        );
    }

    #[test]
    fn test_default_messages_by_classification() {
        let own = annotated(Annotation::new("asteroids.Expensive"), true);
        let provider = provider_for(&own.annotation);

        assert_eq!(
            provider.build_message(&own, UsageClassification::SingleCall),
            "'render()' is marked expensive with @Expensive"
        );
        assert_eq!(
            provider.build_message(&own, UsageClassification::Loop),
            "'render()' is marked expensive with @Expensive and is called inside a loop"
        );
        assert_eq!(
            provider.highlight_level(Some(UsageClassification::SingleCall)),
            HighlightLevel::WeakWarning
        );
        assert_eq!(
            provider.highlight_level(Some(UsageClassification::Lambda)),
            HighlightLevel::GenericErrorOrWarning
        );
        assert_eq!(provider.highlight_level(None), HighlightLevel::WeakWarning);
    }

    #[test]
    fn test_default_inherited_and_override() {
        let inherited = annotated(Annotation::new("asteroids.Expensive"), false);
        let provider = provider_for(&inherited.annotation);

        assert_eq!(
            provider.build_message(&inherited, UsageClassification::Lambda),
            "'render()' is declared in class 'Renderer' marked expensive with @Expensive and is called inside a lambda"
        );
        assert_eq!(
            provider.build_message_expensive_method_overridden(&inherited),
            "Overridden method 'render()' is declared in class 'Renderer' marked expensive with @Expensive"
        );
    }

    #[test]
    fn test_scheduled_for_removal_version() {
        let with_version = annotated(
            Annotation::new(SCHEDULED_FOR_REMOVAL_ANNOTATION)
                .with_attribute("inVersion", AttributeValue::Str("2.0".to_string())),
            true,
        );
        let provider = provider_for(&with_version.annotation);
        assert_eq!(
            provider.build_message(&with_version, UsageClassification::Loop),
            "'render()' is scheduled for removal in version 2.0"
        );
        assert_eq!(
            provider.highlight_level(Some(UsageClassification::SingleCall)),
            HighlightLevel::GenericError
        );

        let without_version = annotated(Annotation::new(SCHEDULED_FOR_REMOVAL_ANNOTATION), false);
        assert_eq!(
            provider.build_message_expensive_method_overridden(&without_version),
            "Overridden method 'render()' is declared in class 'Renderer' which is scheduled for removal in a future version"
        );
    }

    #[test]
    fn test_signature_message() {
        let used = AnnotatedContainingDeclaration {
            target_name: "Heavy".to_string(),
            target_type: "class",
            ..annotated(Annotation::new("asteroids.Expensive"), true)
        };
        assert_eq!(
            DefaultMessageProvider.build_message_expensive_type_in_signature("load()", &used),
            "'load()' references expensive class 'Heavy' marked with @Expensive in its signature"
        );
    }
}
