//! Generator dispatch: select, instantiate, invoke.
//!
//! Backend failures (errors or panics) are reported to the host and never
//! propagate out of dispatch.

use crate::{
    backend::{BackendError, CodeGenerator},
    diagnostic::Diagnostic,
    host::GenerationHost,
    loader::BackendLoader,
    panic_message,
    registry::BackendRegistry,
    select::{DefaultReason, Selection, SelectionError, select},
};
use clientgen_schema::resolve::ResolvedModel;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::debug;

/// Several plugin backends declared the requested language.
pub const CODE_AMBIGUOUS_LANGUAGE: &str = "CG3005";

/// A plugin backend was chosen for the requested language.
pub const CODE_LANGUAGE_SELECTED: &str = "CG3006";

/// No plugin backend declared the language; the default was used.
pub const CODE_DEFAULT_SELECTED: &str = "CG3007";

/// A backend could not be constructed.
pub const CODE_CONSTRUCTION_FAILED: &str = "CG3008";

/// A backend failed while emitting.
pub const CODE_EMISSION_FAILED: &str = "CG3009";

/// Dispatch ended without a usable backend.
pub const CODE_NO_GENERATOR: &str = "CG3010";

///
/// DispatchOutcome
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DispatchOutcome {
    Generated { backend: String, text: String },

    /// Emission failed; `partial` is whatever the backend produced.
    EmissionFailed { backend: String, partial: String },

    /// Construction failed or selection was fatal.
    NoGenerator,
}

impl DispatchOutcome {
    /// Text handed back to the host; empty when nothing was produced.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Generated { text, .. } => text,
            Self::EmissionFailed { partial, .. } => partial,
            Self::NoGenerator => "",
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// Run the selected backend over a resolved model.
pub fn dispatch(
    model: &ResolvedModel,
    registry: &BackendRegistry,
    loader: &dyn BackendLoader,
    host: &GenerationHost<'_>,
) -> DispatchOutcome {
    let options = host.options();
    let reporter = host.reporter();

    // select
    let selection = match select(
        registry,
        loader,
        options.generator.as_deref(),
        &options.language,
    ) {
        Ok(selection) => selection,
        Err(err) => {
            report_selection_error(host, &err);
            return DispatchOutcome::NoGenerator;
        }
    };
    announce(host, &selection);

    // instantiate
    let descriptor = selection.factory().descriptor().clone();
    let constructed = catch_unwind(AssertUnwindSafe(|| selection.factory().instantiate()))
        .unwrap_or_else(|payload| Err(BackendError::new(panic_message(payload.as_ref()))));
    let mut generator: Box<dyn CodeGenerator> = match constructed {
        Ok(generator) => generator,
        Err(err) => {
            reporter.error(
                CODE_CONSTRUCTION_FAILED,
                format!("generator '{}' could not be created: {err}", descriptor.type_id),
            );
            reporter.error(
                CODE_NO_GENERATOR,
                format!("no generator found for language '{}'", options.language),
            );
            return DispatchOutcome::NoGenerator;
        }
    };

    // invoke
    debug!(backend = %descriptor, "invoking backend");
    let emitted = catch_unwind(AssertUnwindSafe(|| generator.generate(model, host)))
        .unwrap_or_else(|payload| Err(BackendError::new(panic_message(payload.as_ref()))));

    match emitted {
        Ok(text) => DispatchOutcome::Generated {
            backend: descriptor.type_id,
            text,
        },
        Err(err) => {
            reporter.error(
                CODE_EMISSION_FAILED,
                format!(
                    "generator '{}' failed while writing '{}': {}",
                    descriptor.type_id,
                    options.output_display(),
                    err.message
                ),
            );
            DispatchOutcome::EmissionFailed {
                backend: descriptor.type_id,
                partial: err.partial.unwrap_or_default(),
            }
        }
    }
}

fn report_selection_error(host: &GenerationHost<'_>, err: &SelectionError) {
    let diagnostic = Diagnostic::error(err.code(), err.to_string());
    let diagnostic = match err {
        SelectionError::Ambiguous { .. } => {
            diagnostic.with_help("select the generator by its fully-qualified type identifier")
        }
        SelectionError::NotFound { .. } => diagnostic,
    };

    host.reporter().report(diagnostic);
}

fn announce(host: &GenerationHost<'_>, selection: &Selection) {
    let reporter = host.reporter();
    let language = &host.options().language;

    match selection {
        Selection::ByName(factory) | Selection::ByTypeId(factory) => {
            debug!(backend = %factory.descriptor(), "explicit generator selected");
        }
        Selection::ByLanguage(factory) => reporter.info(
            CODE_LANGUAGE_SELECTED,
            format!(
                "using generator {} for language '{language}'",
                factory.descriptor()
            ),
        ),
        Selection::Default {
            factory,
            reason: DefaultReason::NoLanguageMatch,
        } => {
            if host.options().report_default_selection {
                reporter.info(
                    CODE_DEFAULT_SELECTED,
                    format!(
                        "no generator declares language '{language}'; using the default {}",
                        factory.descriptor()
                    ),
                );
            }
        }
        Selection::Default {
            factory,
            reason: DefaultReason::AmbiguousLanguage { candidates },
        } => reporter.warning(
            CODE_AMBIGUOUS_LANGUAGE,
            format!(
                "several generators declare language '{language}' ({}); using the default {}",
                candidates.join(", "),
                factory.descriptor()
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostic::{DiagnosticBuffer, Reporter, Severity},
        loader::NullLoader,
        options::GenerationOptions,
        rust,
        test_support::{broken_factory, failing_emitter, panicking_factory, stub_factory},
    };
    use clientgen_schema::share::{ClassifierConfig, NoLocator, SharedTypeClassifier};

    fn run(
        registry: &BackendRegistry,
        options: &GenerationOptions,
        buffer: &DiagnosticBuffer,
    ) -> DispatchOutcome {
        let config = ClassifierConfig::default();
        let host = GenerationHost::new(
            options,
            Reporter::new(buffer),
            SharedTypeClassifier::new(&NoLocator, &config),
        );

        dispatch(&ResolvedModel::default(), registry, &NullLoader, &host)
    }

    fn language(lang: &str) -> GenerationOptions {
        GenerationOptions {
            language: lang.into(),
            ..GenerationOptions::default()
        }
    }

    fn named(generator: &str) -> GenerationOptions {
        GenerationOptions {
            generator: Some(generator.into()),
            ..GenerationOptions::default()
        }
    }

    #[test]
    fn zero_language_matches_selects_default_silently() {
        let registry = BackendRegistry::new(rust::factory());
        let buffer = DiagnosticBuffer::new();
        let outcome = run(&registry, &language("X"), &buffer);

        assert!(outcome.is_success());
        assert!(buffer.entries().is_empty(), "{:?}", buffer.entries());

        let options = GenerationOptions {
            report_default_selection: true,
            ..language("X")
        };
        let buffer = DiagnosticBuffer::new();
        run(&registry, &options, &buffer);
        assert_eq!(buffer.count(Severity::Info), 1);
    }

    #[test]
    fn two_language_matches_fall_back_with_one_warning() {
        let mut registry = BackendRegistry::new(rust::factory());
        registry.register(stub_factory("A", "Acme.A", &["X"], "from a"));
        registry.register(stub_factory("B", "Acme.B", &["x"], "from b"));

        let buffer = DiagnosticBuffer::new();
        let outcome = run(&registry, &language("X"), &buffer);

        let DispatchOutcome::Generated { backend, .. } = &outcome else {
            panic!("expected default backend output, got {outcome:?}");
        };
        assert_eq!(backend, rust::BACKEND_TYPE_ID);

        let warnings = buffer.with_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Acme.A"));
        assert!(warnings[0].message.contains("Acme.B"));
    }

    #[test]
    fn single_language_match_is_announced() {
        let mut registry = BackendRegistry::new(rust::factory());
        registry.register(stub_factory("A", "Acme.A", &["X"], "from a"));

        let buffer = DiagnosticBuffer::new();
        let outcome = run(&registry, &language("x"), &buffer);

        assert_eq!(outcome.text(), "from a");
        assert_eq!(buffer.count(Severity::Info), 1);
    }

    #[test]
    fn construction_failure_reports_no_generator() {
        let mut registry = BackendRegistry::new(rust::factory());
        registry.register(broken_factory("Broken", "Acme.Broken", "boom"));

        let buffer = DiagnosticBuffer::new();
        let outcome = run(&registry, &named("Broken"), &buffer);

        assert_eq!(outcome, DispatchOutcome::NoGenerator);
        assert_eq!(outcome.text(), "");
        let errors = buffer.with_severity(Severity::Error);
        assert!(
            errors
                .iter()
                .any(|e| e.message.contains("Acme.Broken") && e.message.contains("boom"))
        );
        assert!(errors.iter().any(|e| e.message.contains("no generator found")));
    }

    #[test]
    fn panicking_constructor_is_contained() {
        let mut registry = BackendRegistry::new(rust::factory());
        registry.register(panicking_factory("Wild", "Acme.Wild", "kaboom"));

        let buffer = DiagnosticBuffer::new();
        let outcome = run(&registry, &named("Acme.Wild"), &buffer);

        assert_eq!(outcome, DispatchOutcome::NoGenerator);
        assert!(
            buffer
                .with_severity(Severity::Error)
                .iter()
                .any(|e| e.message.contains("kaboom"))
        );
    }

    #[test]
    fn emission_failure_returns_partial_text() {
        let mut registry = BackendRegistry::new(rust::factory());
        registry.register(failing_emitter("Half", "Acme.Half", "disk full", Some("// half")));

        let options = GenerationOptions {
            client_output: Some("client/generated.rs".into()),
            ..named("Half")
        };
        let buffer = DiagnosticBuffer::new();
        let outcome = run(&registry, &options, &buffer);

        assert_eq!(outcome.text(), "// half");
        let errors = buffer.with_severity(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Acme.Half"));
        assert!(errors[0].message.contains("client/generated.rs"));
        assert!(errors[0].message.contains("disk full"));
    }

    #[test]
    fn ambiguous_explicit_name_is_fatal() {
        let mut registry = BackendRegistry::new(rust::factory());
        registry.register(stub_factory("Foo", "Acme.Foo", &[], ""));
        registry.register(stub_factory("Foo", "Other.Foo", &[], ""));

        let buffer = DiagnosticBuffer::new();
        let outcome = run(&registry, &named("Foo"), &buffer);

        assert_eq!(outcome, DispatchOutcome::NoGenerator);
        let errors = buffer.with_severity(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Acme.Foo"));
        assert!(errors[0].message.contains("Other.Foo"));
        assert!(errors[0].help.is_some());
    }
}
