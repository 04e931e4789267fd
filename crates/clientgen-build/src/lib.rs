//! Backend discovery, selection and dispatch for client code generation.
//!
//! ## Crate layout
//! - `diagnostic`: host-facing diagnostics sink and the tracing mirror.
//! - `options`: per-request `GenerationOptions`, loadable from JSON.
//! - `backend` / `loader` / `registry`: backend contracts and discovery.
//! - `select` / `dispatch`: picking a backend and running it in isolation.
//! - `host`: what a backend can ask of the engine while emitting.
//! - `rust`: the built-in Rust backend.
//!
//! [`generate`] ties resolution and dispatch together for one request.

pub mod backend;
pub mod diagnostic;
pub mod dispatch;
pub mod host;
pub mod loader;
pub mod options;
pub mod registry;
pub mod rust;
pub mod select;

use crate::{
    diagnostic::{DiagnosticSink, Reporter},
    dispatch::{DispatchOutcome, dispatch},
    host::GenerationHost,
    loader::{BackendLoader, NullLoader},
    options::GenerationOptions,
    registry::BackendRegistry,
};
use clientgen_schema::{
    node::{MetadataGraph, QualifiedName},
    resolve::{ResolvedModel, resolve_graph},
    share::{NoLocator, SharedTypeClassifier, TypeLocator},
};
use std::any::Any;
use tracing::{info, warn};

/// The request options failed validation.
pub const CODE_INVALID_OPTIONS: &str = "CG0001";

/// Two services resolved one type to different shapes.
pub const CODE_SHAPE_CONFLICT: &str = "CG1401";

/// Best-effort text of a caught panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked without a message".to_string())
}

///
/// GenerationRequest
///
/// Everything one generation run needs from its host. Loader and locator
/// default to implementations that find nothing.
///

pub struct GenerationRequest<'a> {
    pub graph: &'a MetadataGraph,
    pub options: &'a GenerationOptions,
    pub loader: &'a dyn BackendLoader,
    pub locator: &'a dyn TypeLocator,
    pub sink: &'a dyn DiagnosticSink,
}

impl<'a> GenerationRequest<'a> {
    #[must_use]
    pub fn new(
        graph: &'a MetadataGraph,
        options: &'a GenerationOptions,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            graph,
            options,
            loader: &NullLoader,
            locator: &NoLocator,
            sink,
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: &'a dyn BackendLoader) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_locator(mut self, locator: &'a dyn TypeLocator) -> Self {
        self.locator = locator;
        self
    }
}

///
/// GenerationReport
///

#[derive(Debug)]
pub struct GenerationReport {
    pub outcome: DispatchOutcome,

    /// The resolved model, present only when emission succeeded.
    pub model: Option<ResolvedModel>,

    /// Services dropped by fatal resolution errors.
    pub failed_services: Vec<QualifiedName>,
}

impl GenerationReport {
    const fn aborted(failed_services: Vec<QualifiedName>) -> Self {
        Self {
            outcome: DispatchOutcome::NoGenerator,
            model: None,
            failed_services,
        }
    }

    /// Generated text; empty on fatal failure.
    #[must_use]
    pub fn text(&self) -> &str {
        self.outcome.text()
    }

    /// True when every service resolved and the backend emitted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success() && self.failed_services.is_empty()
    }
}

/// Resolve the request's graph and run the selected backend over it.
///
/// Failures never escape: they are reported to the request's sink and
/// reflected in the returned report.
#[must_use]
pub fn generate(request: &GenerationRequest<'_>) -> GenerationReport {
    let options = request.options;
    let reporter = Reporter::new(request.sink);

    if let Err(err) = options.validate() {
        reporter.error(CODE_INVALID_OPTIONS, err.to_string());
        return GenerationReport::aborted(Vec::new());
    }

    // resolve
    let resolved = resolve_graph(request.graph, &options.resolve);
    for failure in &resolved.failures {
        for err in failure.errors.iter() {
            reporter.error(err.code(), err.to_string());
        }
    }
    for conflict in &resolved.conflicts {
        reporter.warning(
            CODE_SHAPE_CONFLICT,
            format!(
                "type '{}' resolves to a different shape in service '{}'; keeping the shape from '{}'",
                conflict.name, conflict.service, conflict.owner
            ),
        );
    }

    let failed_services: Vec<_> = resolved
        .failures
        .iter()
        .map(|f| f.service.clone())
        .collect();
    if !failed_services.is_empty() && resolved.model.services.is_empty() {
        warn!(
            failed = failed_services.len(),
            "no service resolved; skipping generation"
        );
        return GenerationReport::aborted(failed_services);
    }

    // dispatch
    let registry = BackendRegistry::discover(
        rust::factory(),
        request.loader,
        &options.plugin_sources,
        reporter,
    );
    let host = GenerationHost::new(
        options,
        reporter,
        SharedTypeClassifier::new(request.locator, &options.sharing),
    );
    let outcome = dispatch(&resolved.model, &registry, request.loader, &host);
    info!(
        success = outcome.is_success(),
        failed_services = failed_services.len(),
        "generation finished"
    );

    GenerationReport {
        model: outcome.is_success().then_some(resolved.model),
        outcome,
        failed_services,
    }
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        GenerationReport, GenerationRequest,
        backend::{BackendDescriptor, BackendError, BackendFactory, CodeGenerator},
        diagnostic::{Diagnostic, DiagnosticBuffer, DiagnosticSink, Severity},
        dispatch::DispatchOutcome,
        generate,
        host::GenerationHost,
        loader::{BackendLoader, LoadError},
        options::GenerationOptions,
    };
}


///
/// TESTS
///
