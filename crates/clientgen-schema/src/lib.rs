//! Metadata graph and resolution engine for client code generation.
//!
//! ## Crate layout
//! - `node`: the raw metadata graph handed over by the host (services,
//!   entities, complex types, operations, annotations).
//! - `resolve`: staged resolution of a graph into an emission-ready
//!   [`ResolvedModel`](resolve::ResolvedModel).
//! - `share`: shared-type classification and annotation review.
//! - `error`: structured resolution errors and the `ErrorTree` aggregate.

pub mod error;
pub mod node;
pub mod resolve;
pub mod share;

/// Default upper bound on projection chains ("projection of a projection").
pub const DEFAULT_MAX_PROJECTION_DEPTH: usize = 8;

/// Suffix stripped from a service short name when deriving its context name.
pub const SERVICE_SUFFIX: &str = "Service";

/// Suffix appended to derive the emitted context type name.
pub const CONTEXT_SUFFIX: &str = "Context";

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        error::{ErrorTree, ResolveError},
        node::*,
        resolve::{ResolveOptions, ResolvedModel},
        share::{SharedState, SharedTypeClassifier, TypeLocator},
    };
    pub use serde::{Deserialize, Serialize};
}
