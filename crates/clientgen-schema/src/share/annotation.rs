use crate::{prelude::*, share::SharedState};
use derive_more::Display;

/// Annotation type is not available to the client.
pub const CODE_ANNOTATION_NOT_SHARED: &str = "CG2001";

/// Annotation type availability could not be determined.
pub const CODE_ANNOTATION_UNKNOWN: &str = "CG2002";

/// An annotation argument references a type the client cannot see.
pub const CODE_ARGUMENT_NOT_SHARED: &str = "CG2003";

/// An annotation argument type's availability could not be determined.
pub const CODE_ARGUMENT_UNKNOWN: &str = "CG2004";

///
/// AnnotationPlan
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AnnotationPlan {
    Emit,

    /// Replace the annotation with this comment.
    Comment(String),
}

///
/// FindingLevel
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum FindingLevel {
    Info,
    Warning,
}

///
/// SharingFinding
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharingFinding {
    pub level: FindingLevel,
    pub code: &'static str,
    pub subject: QualifiedName,
    pub message: String,
}

///
/// AnnotationReview
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnnotationReview {
    pub plan: AnnotationPlan,
    pub findings: Vec<SharingFinding>,
}

/// Decide whether an annotation on `target` can be propagated to the client.
pub fn review_annotation(
    classifier: &SharedTypeClassifier<'_>,
    annotation: &Annotation,
    target: &str,
) -> AnnotationReview {
    let ty = &annotation.type_name;

    match classifier.classify_type(ty) {
        SharedState::NotShared => AnnotationReview {
            plan: AnnotationPlan::Comment(format!(
                "annotation '{ty}' was not generated: its type is not available to the client"
            )),
            findings: vec![SharingFinding {
                level: FindingLevel::Warning,
                code: CODE_ANNOTATION_NOT_SHARED,
                subject: ty.clone(),
                message: format!(
                    "annotation '{ty}' on '{target}' was not propagated: its type is not shared with the client"
                ),
            }],
        },
        SharedState::Unknown => AnnotationReview {
            plan: AnnotationPlan::Comment(format!(
                "annotation '{ty}' was not generated: its availability to the client is unknown"
            )),
            findings: vec![SharingFinding {
                level: FindingLevel::Info,
                code: CODE_ANNOTATION_UNKNOWN,
                subject: ty.clone(),
                message: format!(
                    "could not determine whether annotation type '{ty}' on '{target}' is shared with the client"
                ),
            }],
        },
        SharedState::SharedBySource | SharedState::SharedByReference => {
            let findings = annotation
                .referenced_types()
                .into_iter()
                .filter_map(|arg| argument_finding(classifier, ty, arg, target))
                .collect();

            AnnotationReview {
                plan: AnnotationPlan::Emit,
                findings,
            }
        }
    }
}

fn argument_finding(
    classifier: &SharedTypeClassifier<'_>,
    annotation: &QualifiedName,
    arg: &QualifiedName,
    target: &str,
) -> Option<SharingFinding> {
    match classifier.classify_type(arg) {
        SharedState::NotShared => Some(SharingFinding {
            level: FindingLevel::Warning,
            code: CODE_ARGUMENT_NOT_SHARED,
            subject: arg.clone(),
            message: format!(
                "type '{arg}' used by annotation '{annotation}' on '{target}' is not shared with the client"
            ),
        }),
        SharedState::Unknown => Some(SharingFinding {
            level: FindingLevel::Info,
            code: CODE_ARGUMENT_UNKNOWN,
            subject: arg.clone(),
            message: format!(
                "could not determine whether type '{arg}' used by annotation '{annotation}' on '{target}' is shared with the client"
            ),
        }),
        SharedState::SharedBySource | SharedState::SharedByReference => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{ClassifierConfig, StaticLocator};

    fn config() -> ClassifierConfig {
        ClassifierConfig {
            common_namespaces: vec!["System".into()],
            ..ClassifierConfig::default()
        }
    }

    #[test]
    fn unshared_argument_type_emits_with_one_warning() {
        let config = config();
        let locator = StaticLocator::new().with_type_source("Shop.Rules.Validator", "server/rules.rs");
        let classifier = SharedTypeClassifier::new(&locator, &config);

        let annotation = Annotation::new("System.ComponentModel.CustomValidation")
            .with_arg(AnnotationArg::Type("Shop.Rules.Validator".into()))
            .with_arg(AnnotationArg::Text("Check".into()));
        let review = review_annotation(&classifier, &annotation, "Shop.Order.Total");

        assert_eq!(review.plan, AnnotationPlan::Emit);
        assert_eq!(review.findings.len(), 1);
        let finding = &review.findings[0];
        assert_eq!(finding.level, FindingLevel::Warning);
        assert_eq!(finding.subject.as_str(), "Shop.Rules.Validator");
        assert!(finding.message.contains("Shop.Rules.Validator"));
    }

    #[test]
    fn unshared_annotation_type_becomes_comment_and_warning() {
        let config = config();
        let locator = StaticLocator::new();
        let classifier = SharedTypeClassifier::new(&locator, &config);

        let review = review_annotation(&classifier, &Annotation::new("Shop.Audit"), "Shop.Order");

        assert!(matches!(&review.plan, AnnotationPlan::Comment(text) if text.contains("Shop.Audit")));
        assert_eq!(review.findings.len(), 1);
        assert_eq!(review.findings[0].level, FindingLevel::Warning);
        assert_eq!(review.findings[0].code, CODE_ANNOTATION_NOT_SHARED);
    }

    #[test]
    fn unknown_annotation_type_is_informational() {
        let config = config();
        let classifier = SharedTypeClassifier::new(&crate::share::NoLocator, &config);

        let review = review_annotation(&classifier, &Annotation::new("Shop.Audit"), "Shop.Order");

        assert!(matches!(review.plan, AnnotationPlan::Comment(_)));
        assert_eq!(review.findings.len(), 1);
        assert_eq!(review.findings[0].level, FindingLevel::Info);
    }

    #[test]
    fn unknown_argument_type_is_informational_only() {
        let config = config();
        let classifier = SharedTypeClassifier::new(&crate::share::NoLocator, &config);

        let annotation = Annotation::new("System.Range")
            .with_arg(AnnotationArg::Type("Shop.Bounds".into()))
            .with_arg(AnnotationArg::Type("System.Int32".into()));
        let review = review_annotation(&classifier, &annotation, "Shop.Order.Total");

        assert_eq!(review.plan, AnnotationPlan::Emit);
        assert_eq!(review.findings.len(), 1);
        assert_eq!(review.findings[0].level, FindingLevel::Info);
        assert_eq!(review.findings[0].subject.as_str(), "Shop.Bounds");
    }
}
