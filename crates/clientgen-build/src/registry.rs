//! Backend registry.
//!
//! Built per generation request from the default backend plus every
//! configured plugin source. A failing source never stops discovery.

use crate::{
    backend::BackendFactory,
    diagnostic::Reporter,
    loader::{BackendLoader, LoadError},
    panic_message,
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, info};

/// A plugin source failed to load some of its types.
pub const CODE_PLUGIN_TYPE_LOAD: &str = "CG3001";

/// A plugin source could not be loaded.
pub const CODE_PLUGIN_LOAD: &str = "CG3002";

///
/// BackendRegistry
///

#[derive(Clone, Debug)]
pub struct BackendRegistry {
    default: BackendFactory,
    plugins: Vec<BackendFactory>,
}

impl BackendRegistry {
    /// Registry holding only the default backend.
    #[must_use]
    pub const fn new(default: BackendFactory) -> Self {
        Self {
            default,
            plugins: Vec::new(),
        }
    }

    /// Scan every source in order, registering what loads.
    #[must_use]
    pub fn discover(
        default: BackendFactory,
        loader: &dyn BackendLoader,
        sources: &[String],
        reporter: Reporter<'_>,
    ) -> Self {
        let mut registry = Self::new(default);

        for source in sources {
            let scanned = catch_unwind(AssertUnwindSafe(|| loader.scan(source)))
                .unwrap_or_else(|payload| {
                    Err(LoadError::Load {
                        source_name: source.clone(),
                        message: panic_message(payload.as_ref()),
                    })
                });

            match scanned {
                Ok(factories) => registry.register_all(factories),
                Err(err @ LoadError::TypeLoad { .. }) => {
                    reporter.warning(CODE_PLUGIN_TYPE_LOAD, err.to_string());
                    if let LoadError::TypeLoad { loaded, .. } = err {
                        registry.register_all(loaded);
                    }
                }
                Err(err @ LoadError::Load { .. }) => {
                    reporter.info(CODE_PLUGIN_LOAD, err.to_string());
                }
            }
        }

        registry
    }

    fn register_all(&mut self, factories: Vec<BackendFactory>) {
        for factory in factories {
            self.register(factory);
        }
    }

    /// Register a plugin backend; a repeated type identifier is ignored.
    pub fn register(&mut self, factory: BackendFactory) {
        let descriptor = factory.descriptor();
        if self.all().any(|f| f.descriptor().type_id == descriptor.type_id) {
            debug!(backend = %descriptor, "backend already registered");
            return;
        }

        info!(backend = %descriptor, "registering backend");
        self.plugins.push(factory);
    }

    #[must_use]
    pub const fn default_backend(&self) -> &BackendFactory {
        &self.default
    }

    #[must_use]
    pub fn plugins(&self) -> &[BackendFactory] {
        &self.plugins
    }

    /// Default backend first, then plugins in discovery order.
    pub fn all(&self) -> impl Iterator<Item = &BackendFactory> {
        std::iter::once(&self.default).chain(self.plugins.iter())
    }

    /// Backends registered under `name`, compared case-insensitively.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Vec<&BackendFactory> {
        self.all()
            .filter(|f| f.descriptor().name.eq_ignore_ascii_case(name))
            .collect()
    }

    /// Plugin backends declaring `language`, compared case-insensitively.
    #[must_use]
    pub fn by_language(&self, language: &str) -> Vec<&BackendFactory> {
        self.plugins
            .iter()
            .filter(|f| f.descriptor().supports(language))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostic::{DiagnosticBuffer, Severity},
        loader::StaticLoader,
        test_support::stub_factory,
    };

    fn sources(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn failing_sources_are_isolated() {
        let buffer = DiagnosticBuffer::new();
        let loader = StaticLoader::new()
            .with_source("good", vec![stub_factory("Ts", "Acme.Ts", &["typescript"], "x")])
            .with_failure(
                "partial",
                LoadError::TypeLoad {
                    source_name: "partial".into(),
                    message: "missing dependency".into(),
                    loaded: vec![stub_factory("Py", "Acme.Py", &["python"], "x")],
                },
            );

        let registry = BackendRegistry::discover(
            crate::rust::factory(),
            &loader,
            &sources(&["good", "partial", "missing"]),
            Reporter::new(&buffer),
        );

        let names: Vec<_> = registry.plugins().iter().map(|f| f.descriptor().name.as_str()).collect();
        assert_eq!(names, ["Ts", "Py"]);
        assert_eq!(buffer.count(Severity::Warning), 1);
        assert_eq!(buffer.count(Severity::Info), 1);
        assert!(buffer.with_severity(Severity::Info)[0].message.contains("missing"));
    }

    #[test]
    fn panicking_loader_is_treated_as_load_failure() {
        struct PanickingLoader;
        impl BackendLoader for PanickingLoader {
            fn scan(&self, _: &str) -> Result<Vec<BackendFactory>, LoadError> {
                panic!("loader exploded");
            }

            fn load_type(&self, _: &str) -> Option<BackendFactory> {
                None
            }
        }

        let buffer = DiagnosticBuffer::new();
        let registry = BackendRegistry::discover(
            crate::rust::factory(),
            &PanickingLoader,
            &sources(&["a", "b"]),
            Reporter::new(&buffer),
        );

        assert!(registry.plugins().is_empty());
        let infos = buffer.with_severity(Severity::Info);
        assert_eq!(infos.len(), 2);
        assert!(infos[0].message.contains("loader exploded"));
    }

    #[test]
    fn lookups_are_case_insensitive_and_deduplicated() {
        let mut registry = BackendRegistry::new(crate::rust::factory());
        registry.register(stub_factory("Foo", "Acme.Foo", &["TypeScript"], "x"));
        registry.register(stub_factory("Foo", "Acme.Foo", &["TypeScript"], "x"));

        assert_eq!(registry.plugins().len(), 1);
        assert_eq!(registry.by_name("foo").len(), 1);
        assert_eq!(registry.by_name("RUST").len(), 1);
        assert_eq!(registry.by_language("typescript").len(), 1);
        assert!(registry.by_language("rust").is_empty());
    }
}
