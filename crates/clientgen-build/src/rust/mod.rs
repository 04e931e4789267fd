//! Built-in Rust backend.
//!
//! Emits one flat module per namespace holding plain data structs, a
//! `{Root}Kind` enum per polymorphic hierarchy, a `{Entity}Methods` trait
//! for bound methods and one context trait per service.

mod context;
mod ty;
mod types;

use crate::{
    backend::{BackendDescriptor, BackendError, BackendFactory, CodeGenerator},
    host::GenerationHost,
    options::DEFAULT_LANGUAGE,
};
use clientgen_schema::{
    node::{Annotation, QualifiedName},
    resolve::ResolvedModel,
    share::AnnotationPlan,
};
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use ty::ModulePaths;

/// Registered name of the built-in backend.
pub const BACKEND_NAME: &str = "rust";

/// Fully-qualified identifier of the built-in backend.
pub const BACKEND_TYPE_ID: &str = "clientgen_build::rust::RustBackend";

/// Factory for the built-in backend.
#[must_use]
pub fn factory() -> BackendFactory {
    BackendFactory::new(
        BackendDescriptor::new(BACKEND_NAME, BACKEND_TYPE_ID).with_language(DEFAULT_LANGUAGE),
        || Ok(Box::new(RustBackend)),
    )
}

///
/// RustBackend
///

#[derive(Clone, Copy, Debug, Default)]
pub struct RustBackend;

impl CodeGenerator for RustBackend {
    fn generate(
        &mut self,
        model: &ResolvedModel,
        host: &GenerationHost<'_>,
    ) -> Result<String, BackendError> {
        let mut builder = ClientBuilder::new(model, host);

        match builder.build() {
            Ok(()) => Ok(builder.render().to_string()),
            Err(message) => {
                Err(BackendError::new(message).with_partial(builder.render().to_string()))
            }
        }
    }
}

///
/// ClientBuilder
///
/// Accumulates emitted items per module so a failure part-way through can
/// still hand back what was written.
///

pub(crate) struct ClientBuilder<'a, 'h> {
    pub(crate) model: &'a ResolvedModel,
    pub(crate) host: &'a GenerationHost<'h>,
    pub(crate) paths: ModulePaths<'a>,
    modules: BTreeMap<String, (Ident, TokenStream)>,
    types: BTreeMap<String, BTreeSet<String>>,
}

impl<'a, 'h> ClientBuilder<'a, 'h> {
    pub(crate) fn new(model: &'a ResolvedModel, host: &'a GenerationHost<'h>) -> Self {
        Self {
            model,
            host,
            paths: ModulePaths::new(host.options().client_root_namespace.as_deref()),
            modules: BTreeMap::new(),
            types: BTreeMap::new(),
        }
    }

    fn build(&mut self) -> Result<(), String> {
        types::generate(self)?;
        context::generate(self)?;

        debug!(modules = self.modules.len(), "rust client emitted");
        Ok(())
    }

    /// Append items to the module that owns `name`.
    pub(crate) fn emit(
        &mut self,
        name: &QualifiedName,
        tokens: TokenStream,
    ) -> Result<(), String> {
        let module = self.paths.module_of(name);
        let ident = ty::ident(&module)?;

        self.modules
            .entry(module)
            .or_insert_with(|| (ident, quote!()))
            .1
            .extend(tokens);

        Ok(())
    }

    /// Reserve a type identifier in the module that owns `name`.
    pub(crate) fn claim_type(&mut self, name: &QualifiedName, ident: &Ident) -> Result<(), String> {
        let module = self.paths.module_of(name);
        let claimed = self.types.entry(module.clone()).or_default();

        if claimed.insert(ident.to_string()) {
            Ok(())
        } else {
            Err(format!(
                "'{name}' emits as '{ident}', which module '{module}' already declares"
            ))
        }
    }

    fn render(&self) -> TokenStream {
        let mut tokens = quote!();

        for (ident, items) in self.modules.values() {
            tokens.extend(quote! {
                pub mod #ident {
                    #items
                }
            });
        }

        tokens
    }

    /// Doc attributes for a set of annotations on `target`.
    pub(crate) fn annotation_docs(&self, annotations: &[Annotation], target: &str) -> TokenStream {
        let mut tokens = quote!();

        for annotation in annotations {
            let line = match self.host.review_annotation(annotation, target) {
                AnnotationPlan::Emit => ty::render_annotation(annotation),
                AnnotationPlan::Comment(reason) => {
                    format!("{} ({reason})", ty::render_annotation(annotation))
                }
            };
            tokens.extend(quote!(#[doc = #line]));
        }

        tokens
    }
}

///
/// IdentScope
///
/// Identifiers already declared inside one emitted item. Distinct member
/// names can fold to the same Rust identifier once cased.
///

#[derive(Debug, Default)]
pub(crate) struct IdentScope {
    owner: String,
    seen: BTreeSet<String>,
}

impl IdentScope {
    pub(crate) fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            seen: BTreeSet::new(),
        }
    }

    pub(crate) fn claim(&mut self, ident: &Ident, name: &str) -> Result<(), String> {
        if self.seen.insert(ident.to_string()) {
            Ok(())
        } else {
            Err(format!(
                "'{}.{name}' emits as '{ident}', which '{}' already declares",
                self.owner, self.owner
            ))
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostic::{DiagnosticBuffer, Reporter, Severity},
        options::GenerationOptions,
    };
    use clientgen_schema::{
        node::{
            AssociationInfo, EntityType, MetadataGraph, Operation, OperationKind, Property,
            ServiceDescriptor, TypeRef,
        },
        resolve::{ResolveOptions, resolve_graph},
        share::{ClassifierConfig, NoLocator, SharedTypeClassifier, StaticLocator, TypeLocator},
    };

    fn shop() -> MetadataGraph {
        MetadataGraph::new()
            .with_entity(
                EntityType::new("Shop.Customer")
                    .with_key(["Id"])
                    .with_property(Property::new("Id", TypeRef::scalar("Int32")))
                    .with_property(Property::new("Name", TypeRef::scalar("String")))
                    .with_property(
                        Property::new(
                            "Orders",
                            TypeRef::collection(TypeRef::entity("Shop.Order")),
                        )
                        .with_association(AssociationInfo::new("Placed", ["Id"], ["CustomerId"])),
                    ),
            )
            .with_entity(
                EntityType::new("Shop.Order")
                    .with_key(["Id"])
                    .with_known_subtype("Shop.RushOrder")
                    .with_property(Property::new("Id", TypeRef::scalar("Int32")))
                    .with_property(Property::new("CustomerId", TypeRef::scalar("Int32")))
                    .with_property(Property::new("Type", TypeRef::scalar("String")))
                    .with_property(
                        Property::new("Customer", TypeRef::entity("Shop.Customer"))
                            .with_association(
                                AssociationInfo::new("Placed", ["CustomerId"], ["Id"])
                                    .foreign_key(),
                            ),
                    ),
            )
            .with_entity(EntityType::new("Shop.RushOrder").with_base("Shop.Order"))
            .with_service(
                ServiceDescriptor::new("Shop.OrderService")
                    .with_operation(Operation::query(
                        "Orders",
                        TypeRef::collection(TypeRef::entity("Shop.Order")),
                    ))
                    .with_operation(
                        Operation::new("Cancel", OperationKind::Custom)
                            .with_parameter("order", TypeRef::entity("Shop.Order"))
                            .with_parameter("reason", TypeRef::scalar("String")),
                    )
                    .with_entity("Shop.RushOrder"),
            )
    }

    fn emit(
        graph: &MetadataGraph,
        locator: &dyn TypeLocator,
        buffer: &DiagnosticBuffer,
    ) -> Result<String, BackendError> {
        let outcome = resolve_graph(graph, &ResolveOptions::default());
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);

        let options = GenerationOptions {
            client_root_namespace: Some("Shop".into()),
            ..GenerationOptions::default()
        };
        let config = ClassifierConfig::default();
        let host = GenerationHost::new(
            &options,
            Reporter::new(buffer),
            SharedTypeClassifier::new(locator, &config),
        );

        RustBackend.generate(&outcome.model, &host)
    }

    #[test]
    fn emits_structs_kinds_methods_and_context() {
        let buffer = DiagnosticBuffer::new();
        let text = emit(&shop(), &NoLocator, &buffer).unwrap();

        assert!(text.contains("pub mod client"), "{text}");
        assert!(text.contains("pub struct Customer"), "{text}");
        assert!(text.contains("pub r#type : String"), "{text}");
        assert!(
            text.contains("pub customer : Option < Box < super :: client :: Customer"),
            "{text}"
        );
        assert!(text.contains("pub enum OrderKind"), "{text}");
        assert!(text.contains("RushOrder (super :: client :: RushOrder)"), "{text}");
        assert!(text.contains("pub trait OrderMethods"), "{text}");
        assert!(text.contains("fn cancel (& self , reason : String)"), "{text}");
        assert!(text.contains("pub trait OrderContext"), "{text}");
        assert!(text.contains("fn orders_query (& self)"), "{text}");
        assert!(!buffer.has_errors());
    }

    #[test]
    fn members_compiled_into_the_client_are_skipped() {
        let locator = StaticLocator::new().with_member_source(
            "Shop.Customer",
            "Name",
            "client/customer_ext.rs",
        );
        let graph = shop();
        let outcome = resolve_graph(&graph, &ResolveOptions::default());
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);

        let options = GenerationOptions {
            client_root_namespace: Some("Shop".into()),
            sharing: ClassifierConfig {
                client_sources: vec!["client/customer_ext.rs".into()],
                ..ClassifierConfig::default()
            },
            ..GenerationOptions::default()
        };
        let buffer = DiagnosticBuffer::new();
        let host = GenerationHost::new(
            &options,
            Reporter::new(&buffer),
            SharedTypeClassifier::new(&locator, &options.sharing),
        );

        let text = RustBackend.generate(&outcome.model, &host).unwrap();
        assert!(!text.contains("pub name : String"), "{text}");
        assert!(text.contains("pub id : i32"), "{text}");
    }

    #[test]
    fn unmappable_scalar_fails_with_partial_output() {
        let graph = MetadataGraph::new()
            .with_entity(
                EntityType::new("Shop.Alpha")
                    .with_key(["Id"])
                    .with_property(Property::new("Id", TypeRef::scalar("Int32"))),
            )
            .with_entity(
                EntityType::new("Shop.Zulu")
                    .with_key(["Id"])
                    .with_property(Property::new("Id", TypeRef::scalar("Int32[]"))),
            )
            .with_service(
                ServiceDescriptor::new("Shop.Service")
                    .with_entity("Shop.Alpha")
                    .with_entity("Shop.Zulu"),
            );

        let buffer = DiagnosticBuffer::new();
        let err = emit(&graph, &NoLocator, &buffer).unwrap_err();

        assert!(err.message.contains("Int32[]"), "{}", err.message);
        let partial = err.partial.unwrap_or_default();
        assert!(partial.contains("pub struct Alpha"), "{partial}");
        assert!(!partial.contains("Zulu"), "{partial}");
    }

    #[test]
    fn unshared_annotation_becomes_a_doc_note_with_a_warning() {
        let graph = MetadataGraph::new()
            .with_entity(
                EntityType::new("Shop.Tag")
                    .with_key(["Id"])
                    .with_property(Property::new("Id", TypeRef::scalar("Int32")))
                    .with_annotation(Annotation::new("Server.Audited")),
            )
            .with_service(ServiceDescriptor::new("Shop.Service").with_entity("Shop.Tag"));
        let locator = StaticLocator::new().with_module("Server.Audited", "server");

        let buffer = DiagnosticBuffer::new();
        let text = emit(&graph, &locator, &buffer).unwrap();

        assert!(text.contains("@Server.Audited"), "{text}");
        assert_eq!(buffer.count(Severity::Warning), 1);
    }

    #[test]
    fn members_folding_to_one_field_fail_with_partial_output() {
        let graph = MetadataGraph::new()
            .with_entity(
                EntityType::new("Shop.Order")
                    .with_key(["Id"])
                    .with_property(Property::new("Id", TypeRef::scalar("Int32")))
                    .with_property(Property::new("Name", TypeRef::scalar("String")))
                    .with_property(Property::new("name", TypeRef::scalar("String"))),
            )
            .with_service(ServiceDescriptor::new("Shop.Service").with_entity("Shop.Order"));

        let buffer = DiagnosticBuffer::new();
        let err = emit(&graph, &NoLocator, &buffer).unwrap_err();

        assert!(err.message.contains("Shop.Order.name"), "{}", err.message);
        assert!(err.partial.is_some());
    }

    #[test]
    fn operations_folding_to_one_method_fail() {
        let graph = MetadataGraph::new()
            .with_entity(
                EntityType::new("Shop.Order")
                    .with_key(["Id"])
                    .with_property(Property::new("Id", TypeRef::scalar("Int32"))),
            )
            .with_service(
                ServiceDescriptor::new("Shop.Service")
                    .with_entity("Shop.Order")
                    .with_operation(Operation::new("GetOrders", OperationKind::Invoke))
                    .with_operation(Operation::new("getOrders", OperationKind::Invoke)),
            );

        let buffer = DiagnosticBuffer::new();
        let err = emit(&graph, &NoLocator, &buffer).unwrap_err();

        assert!(err.message.contains("get_orders"), "{}", err.message);
    }

    #[test]
    fn synthesized_kind_enum_clashing_with_an_entity_fails() {
        let graph = MetadataGraph::new()
            .with_entity(
                EntityType::new("Shop.Order")
                    .with_key(["Id"])
                    .with_known_subtype("Shop.RushOrder")
                    .with_property(Property::new("Id", TypeRef::scalar("Int32"))),
            )
            .with_entity(EntityType::new("Shop.RushOrder").with_base("Shop.Order"))
            .with_entity(
                EntityType::new("Shop.OrderKind")
                    .with_key(["Code"])
                    .with_property(Property::new("Code", TypeRef::scalar("String"))),
            )
            .with_service(
                ServiceDescriptor::new("Shop.Service")
                    .with_entity("Shop.RushOrder")
                    .with_entity("Shop.OrderKind"),
            );

        let buffer = DiagnosticBuffer::new();
        let err = emit(&graph, &NoLocator, &buffer).unwrap_err();

        assert!(err.message.contains("OrderKind"), "{}", err.message);
        assert!(err.message.contains("already declares"), "{}", err.message);
    }
}
