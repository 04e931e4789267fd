use crate::{
    diagnostic::{Diagnostic, Reporter},
    options::GenerationOptions,
};
use clientgen_schema::{
    node::{Annotation, QualifiedName},
    share::{AnnotationPlan, FindingLevel, SharedState, SharedTypeClassifier, review_annotation},
};

/// Subcategory attached to shared-type diagnostics.
pub const SHARING_SUBCATEGORY: &str = "shared-types";

///
/// GenerationHost
///
/// What a backend sees of the engine while emitting: options, diagnostics
/// and shared-type answers for the current request.
///

pub struct GenerationHost<'a> {
    options: &'a GenerationOptions,
    reporter: Reporter<'a>,
    classifier: SharedTypeClassifier<'a>,
}

impl<'a> GenerationHost<'a> {
    #[must_use]
    pub const fn new(
        options: &'a GenerationOptions,
        reporter: Reporter<'a>,
        classifier: SharedTypeClassifier<'a>,
    ) -> Self {
        Self {
            options,
            reporter,
            classifier,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &GenerationOptions {
        self.options
    }

    #[must_use]
    pub const fn reporter(&self) -> Reporter<'a> {
        self.reporter
    }

    #[must_use]
    pub const fn classifier(&self) -> &SharedTypeClassifier<'a> {
        &self.classifier
    }

    /// Review an annotation on `target`, reporting every finding.
    pub fn review_annotation(&self, annotation: &Annotation, target: &str) -> AnnotationPlan {
        let review = review_annotation(&self.classifier, annotation, target);

        for finding in review.findings {
            let diagnostic = match finding.level {
                FindingLevel::Warning => Diagnostic::warning(finding.code, finding.message),
                FindingLevel::Info => Diagnostic::info(finding.code, finding.message),
            };
            self.reporter
                .report(diagnostic.with_subcategory(SHARING_SUBCATEGORY));
        }

        review.plan
    }

    /// True when the client already compiles the member's source.
    #[must_use]
    pub fn member_shared_by_source(&self, owner: &QualifiedName, member: &str) -> bool {
        self.classifier.classify_member(owner, member) == SharedState::SharedBySource
    }
}
