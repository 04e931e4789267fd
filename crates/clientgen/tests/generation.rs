use clientgen::{
    ErrorKind, ErrorOrigin,
    build::{
        diagnostic::{Diagnostic, DiagnosticBuffer, DiagnosticSink, Severity},
        dispatch::DispatchOutcome,
        loader::StaticLoader,
        rust,
    },
    error::InputErrorKind,
    generate_json,
    prelude::*,
    resolve,
    schema::resolve::ResolveOptions,
};

///
/// Fixtures
///

struct Echo(&'static str);

impl CodeGenerator for Echo {
    fn generate(&mut self, _: &ResolvedModel, _: &GenerationHost<'_>) -> Result<String, BackendError> {
        Ok(self.0.to_string())
    }
}

fn echo(name: &str, type_id: &str, language: &str, output: &'static str) -> BackendFactory {
    BackendFactory::new(
        BackendDescriptor::new(name, type_id).with_language(language),
        move || Ok(Box::new(Echo(output))),
    )
}

fn int(name: &str) -> Property {
    Property::new(name, TypeRef::scalar("Int32"))
}

fn gadget_graph() -> MetadataGraph {
    MetadataGraph::new()
        .with_entity(
            EntityType::new("Shop.Gadget")
                .with_key(["Id"])
                .with_property(int("Id"))
                .with_property(Property::new("Label", TypeRef::scalar("String"))),
        )
        .with_service(ServiceDescriptor::new("Shop.GadgetService").with_operation(
            Operation::query("Gadgets", TypeRef::collection(TypeRef::entity("Shop.Gadget"))),
        ))
}

fn errors(buffer: &DiagnosticBuffer) -> Vec<String> {
    buffer
        .with_severity(Severity::Error)
        .into_iter()
        .map(|d| d.message)
        .collect()
}

///
/// Resolution failures
///

#[test]
fn root_without_key_fails_before_emission() {
    let graph = MetadataGraph::new()
        .with_entity(EntityType::new("Shop.Widget").with_property(int("Size")))
        .with_service(ServiceDescriptor::new("Shop.WidgetService").with_operation(
            Operation::query("Widgets", TypeRef::collection(TypeRef::entity("Shop.Widget"))),
        ));
    let options = GenerationOptions::default();
    let buffer = DiagnosticBuffer::new();

    let report = generate(&GenerationRequest::new(&graph, &options, &buffer));

    assert!(!report.is_success());
    assert_eq!(report.text(), "");
    let errors = errors(&buffer);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("Widget"));
    assert!(errors[0].contains("WidgetService"));
}

#[test]
fn key_on_derived_entity_names_type_and_field() {
    let graph = MetadataGraph::new()
        .with_entity(
            EntityType::new("Shop.Widget")
                .with_key(["Id"])
                .with_property(int("Id"))
                .with_known_subtype("Shop.WidgetVariant"),
        )
        .with_entity(
            EntityType::new("Shop.WidgetVariant")
                .with_base("Shop.Widget")
                .with_key(["SubKey"])
                .with_property(int("SubKey")),
        )
        .with_service(ServiceDescriptor::new("Shop.WidgetService").with_entity("Shop.Widget"));

    let err = resolve(&graph, &ResolveOptions::default()).unwrap_err();

    assert_eq!(err.origin, ErrorOrigin::Resolve);
    assert!(matches!(err.kind, ErrorKind::Resolve { .. }));
    assert!(err.message.contains("SubKey"), "{}", err.message);
    assert!(err.message.contains("WidgetVariant"), "{}", err.message);
}

#[test]
fn failing_service_does_not_stop_the_others() {
    let graph = gadget_graph()
        .with_entity(EntityType::new("Shop.Widget").with_property(int("Size")))
        .with_service(ServiceDescriptor::new("Shop.WidgetService").with_entity("Shop.Widget"));
    let options = GenerationOptions::default();
    let buffer = DiagnosticBuffer::new();

    let report = generate(&GenerationRequest::new(&graph, &options, &buffer));

    assert!(report.outcome.is_success());
    assert!(!report.is_success());
    assert_eq!(report.failed_services, [QualifiedName::from("Shop.WidgetService")]);
    assert!(report.text().contains("pub struct Gadget"));
    assert!(!report.text().contains("Widget"));
}

///
/// Backend selection
///

#[test]
fn ambiguous_generator_name_lists_both_identities() {
    let loader = StaticLoader::new().with_source(
        "plugins",
        vec![
            echo("Foo", "Acme.Generators.Foo", "ts", "acme"),
            echo("Foo", "Other.Generators.Foo", "ts", "other"),
        ],
    );
    let options = GenerationOptions {
        generator: Some("Foo".into()),
        plugin_sources: vec!["plugins".into()],
        ..GenerationOptions::default()
    };
    let graph = gadget_graph();
    let buffer = DiagnosticBuffer::new();

    let report = generate(&GenerationRequest::new(&graph, &options, &buffer).with_loader(&loader));

    assert_eq!(report.outcome, DispatchOutcome::NoGenerator);
    let errors = errors(&buffer);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("Acme.Generators.Foo"));
    assert!(errors[0].contains("Other.Generators.Foo"));

    // the fully-qualified identity resolves the collision
    let options = GenerationOptions {
        generator: Some("Other.Generators.Foo".into()),
        ..options
    };
    let buffer = DiagnosticBuffer::new();
    let report = generate(&GenerationRequest::new(&graph, &options, &buffer).with_loader(&loader));
    assert_eq!(report.text(), "other");
}

#[test]
fn unknown_language_uses_default_backend_without_warning() {
    let graph = gadget_graph();
    let options = GenerationOptions {
        language: "X".into(),
        ..GenerationOptions::default()
    };
    let buffer = DiagnosticBuffer::new();

    let report = generate(&GenerationRequest::new(&graph, &options, &buffer));

    let DispatchOutcome::Generated { backend, text } = &report.outcome else {
        panic!("expected generated output, got {:?}", report.outcome);
    };
    assert_eq!(backend, rust::BACKEND_TYPE_ID);
    assert!(text.contains("pub trait GadgetContext"));
    assert_eq!(buffer.count(Severity::Warning), 0);
    assert_eq!(buffer.count(Severity::Error), 0);
}

#[test]
fn two_language_matches_fall_back_with_one_warning() {
    let loader = StaticLoader::new()
        .with_source("a", vec![echo("XA", "Acme.XA", "X", "a")])
        .with_source("b", vec![echo("XB", "Acme.XB", "x", "b")]);
    let options = GenerationOptions {
        language: "X".into(),
        plugin_sources: vec!["a".into(), "b".into()],
        ..GenerationOptions::default()
    };
    let graph = gadget_graph();
    let buffer = DiagnosticBuffer::new();

    let report = generate(&GenerationRequest::new(&graph, &options, &buffer).with_loader(&loader));

    assert!(report.text().contains("pub struct Gadget"));
    let warnings = buffer.with_severity(Severity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Acme.XA"));
    assert!(warnings[0].message.contains("Acme.XB"));
}

#[test]
fn failing_construction_reports_no_generator() {
    let boom = BackendFactory::new(BackendDescriptor::new("Boom", "Acme.Boom"), || {
        Err(BackendError::new("boom"))
    });
    let loader = StaticLoader::new().with_type(boom);
    let options = GenerationOptions {
        generator: Some("Acme.Boom".into()),
        ..GenerationOptions::default()
    };
    let graph = gadget_graph();
    let buffer = DiagnosticBuffer::new();

    let report = generate(&GenerationRequest::new(&graph, &options, &buffer).with_loader(&loader));

    assert_eq!(report.text(), "");
    let errors = errors(&buffer);
    assert!(errors.iter().any(|e| e.contains("Acme.Boom") && e.contains("boom")));
    assert!(errors.iter().any(|e| e.contains("no generator found")));
}

///
/// Shared types
///

#[test]
fn shared_annotation_with_unshared_argument_warns_once() {
    let graph = MetadataGraph::new()
        .with_entity(
            EntityType::new("Shop.Gadget")
                .with_key(["Id"])
                .with_property(int("Id"))
                .with_annotation(
                    Annotation::new("Shop.Rules.Check")
                        .with_arg(AnnotationArg::Type("Server.Validator".into())),
                ),
        )
        .with_service(ServiceDescriptor::new("Shop.GadgetService").with_entity("Shop.Gadget"));
    let options = GenerationOptions {
        sharing: ClassifierConfig {
            common_namespaces: vec!["Shop.Rules".into()],
            ..ClassifierConfig::default()
        },
        ..GenerationOptions::default()
    };
    let locator = StaticLocator::new();
    let buffer = DiagnosticBuffer::new();

    let report =
        generate(&GenerationRequest::new(&graph, &options, &buffer).with_locator(&locator));

    assert!(report.is_success());
    assert!(report.text().contains("@Shop.Rules.Check(typeof(Server.Validator))"));
    let warnings = buffer.with_severity(Severity::Warning);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].message.contains("Server.Validator"));
}

///
/// Batch and JSON entry points
///

struct PanicOnError;

impl DiagnosticSink for PanicOnError {
    fn report(&self, diagnostic: Diagnostic) {
        assert!(diagnostic.severity != Severity::Error, "sink rejected: {}", diagnostic.message);
    }
}

#[test]
fn batch_isolates_a_panicking_request() {
    let broken = MetadataGraph::new()
        .with_entity(EntityType::new("Shop.Widget").with_property(int("Size")))
        .with_service(ServiceDescriptor::new("Shop.WidgetService").with_entity("Shop.Widget"));
    let good = gadget_graph();
    let options = GenerationOptions::default();
    let buffer = DiagnosticBuffer::new();

    let results = clientgen::generate_batch(&[
        GenerationRequest::new(&broken, &options, &PanicOnError),
        GenerationRequest::new(&good, &options, &buffer),
    ]);

    assert_eq!(results.len(), 2);
    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert!(err.message.contains("sink rejected"));
    assert!(results[1].as_ref().is_ok_and(GenerationReport::is_success));
}

#[test]
fn json_inputs_drive_generation() {
    let graph = r#"{
        "services": [{
            "name": "Shop.GadgetService",
            "operations": [{
                "name": "Gadgets",
                "kind": "query",
                "returns": { "collection": { "entity": "Shop.Gadget" } }
            }]
        }],
        "entities": {
            "Shop.Gadget": {
                "name": "Shop.Gadget",
                "key": ["Id"],
                "properties": [{ "name": "Id", "ty": { "scalar": "Int32" } }]
            }
        }
    }"#;
    let buffer = DiagnosticBuffer::new();

    let report = generate_json(graph, r#"{ "client_root_namespace": "Shop" }"#, &buffer).unwrap();
    assert!(report.is_success());
    assert!(report.text().contains("pub mod client"));
    assert!(report.text().contains("fn gadgets_query (& self)"));

    let err = generate_json(graph, "{ not json", &buffer).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Input(InputErrorKind::Malformed));
    assert_eq!(err.origin, ErrorOrigin::Options);

    let err = generate_json(graph, r#"{ "max_projection_depth": 0 }"#, &buffer).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Input(InputErrorKind::Invalid));
}
