//! Client code generation from service metadata.
//!
//! ## Crate layout
//! - `schema`: metadata graph, staged resolution and shared-type
//!   classification.
//! - `build`: diagnostics, options, backend discovery and dispatch, plus
//!   the built-in Rust backend.
//! - `error`: public error type for the fallible entry points.
//!
//! [`generate`] never fails: every problem surfaces as a diagnostic on the
//! request's sink. The `*_json` and [`resolve`] helpers return [`Error`]
//! for hosts that want a single typed failure instead.

pub use clientgen_build as build;
pub use clientgen_schema as schema;

pub mod error;

pub use build::{GenerationReport, GenerationRequest, generate};
pub use error::{Error, ErrorKind, ErrorOrigin};

use crate::{
    build::{diagnostic::DiagnosticSink, options::GenerationOptions},
    schema::{
        node::MetadataGraph,
        resolve::{ResolveOptions, ResolvedModel, resolve_graph},
    },
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{error, info};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run several requests, each in its own failure boundary.
///
/// A request that panics yields an internal [`Error`] in its slot; the
/// remaining requests still run.
#[must_use]
pub fn generate_batch(requests: &[GenerationRequest<'_>]) -> Vec<Result<GenerationReport, Error>> {
    info!(requests = requests.len(), "batch generation started");

    requests
        .iter()
        .enumerate()
        .map(|(index, request)| {
            catch_unwind(AssertUnwindSafe(|| generate(request))).map_err(|payload| {
                let message = build::panic_message(payload.as_ref());
                error!(index, %message, "generation request panicked");

                Error::new(ErrorKind::Internal, ErrorOrigin::Dispatch, message)
            })
        })
        .collect()
}

/// Parse metadata and options from JSON, then generate.
pub fn generate_json(
    graph: &str,
    options: &str,
    sink: &dyn DiagnosticSink,
) -> Result<GenerationReport, Error> {
    let graph: MetadataGraph = serde_json::from_str(graph)?;
    let options = GenerationOptions::from_json(options)?;

    Ok(generate(&GenerationRequest::new(&graph, &options, sink)))
}

/// Resolve every service, failing on the first service that does not
/// resolve.
pub fn resolve(graph: &MetadataGraph, options: &ResolveOptions) -> Result<ResolvedModel, Error> {
    let outcome = resolve_graph(graph, options);

    match outcome.failures.into_iter().next() {
        Some(failure) => Err(failure.errors.into()),
        None => Ok(outcome.model),
    }
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error, generate, generate_batch,
        build::prelude::*,
        schema::{
            node::{
                Annotation, AnnotationArg, AssociationInfo, ComplexType, EntityType,
                MetadataGraph, Operation, OperationKind, Property, QualifiedName,
                ServiceDescriptor, TypeRef,
            },
            resolve::ResolvedModel,
            share::{ClassifierConfig, StaticLocator, TypeLocator},
        },
    };
}
