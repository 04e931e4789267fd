use crate::{backend::BackendFactory, loader::BackendLoader, registry::BackendRegistry};
use thiserror::Error as ThisError;

///
/// SelectionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SelectionError {
    #[error(
        "generator name '{name}' is ambiguous; it is registered by {}. Use the fully-qualified type identifier instead",
        .candidates.join(", ")
    )]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("no generator named '{name}' was found")]
    NotFound { name: String },
}

impl SelectionError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Ambiguous { .. } => "CG3003",
            Self::NotFound { .. } => "CG3004",
        }
    }
}

///
/// DefaultReason
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DefaultReason {
    NoLanguageMatch,
    AmbiguousLanguage { candidates: Vec<String> },
}

///
/// Selection
///

#[derive(Clone, Debug)]
pub enum Selection {
    ByName(BackendFactory),
    ByTypeId(BackendFactory),
    ByLanguage(BackendFactory),
    Default {
        factory: BackendFactory,
        reason: DefaultReason,
    },
}

impl Selection {
    #[must_use]
    pub const fn factory(&self) -> &BackendFactory {
        match self {
            Self::ByName(factory)
            | Self::ByTypeId(factory)
            | Self::ByLanguage(factory)
            | Self::Default { factory, .. } => factory,
        }
    }
}

/// Pick a backend: by explicit identifier when one is given, otherwise by
/// language with the default backend as fallback.
pub fn select(
    registry: &BackendRegistry,
    loader: &dyn BackendLoader,
    generator: Option<&str>,
    language: &str,
) -> Result<Selection, SelectionError> {
    match generator {
        Some(name) => select_explicit(registry, loader, name),
        None => Ok(select_by_language(registry, language)),
    }
}

fn select_explicit(
    registry: &BackendRegistry,
    loader: &dyn BackendLoader,
    name: &str,
) -> Result<Selection, SelectionError> {
    match registry.by_name(name).as_slice() {
        [one] => return Ok(Selection::ByName((*one).clone())),
        [] => {}
        many => {
            return Err(SelectionError::Ambiguous {
                name: name.to_string(),
                candidates: many
                    .iter()
                    .map(|f| f.descriptor().type_id.clone())
                    .collect(),
            });
        }
    }

    // a type identifier loads directly; the registry only covers loaders
    // that cannot resolve types on their own
    loader
        .load_type(name)
        .or_else(|| {
            registry
                .all()
                .find(|f| f.descriptor().type_id == name)
                .cloned()
        })
        .map(Selection::ByTypeId)
        .ok_or_else(|| SelectionError::NotFound {
            name: name.to_string(),
        })
}

fn select_by_language(registry: &BackendRegistry, language: &str) -> Selection {
    let default = registry.default_backend().clone();

    match registry.by_language(language).as_slice() {
        [] => Selection::Default {
            factory: default,
            reason: DefaultReason::NoLanguageMatch,
        },
        [one] => Selection::ByLanguage((*one).clone()),
        many => Selection::Default {
            factory: default,
            reason: DefaultReason::AmbiguousLanguage {
                candidates: many.iter().map(|f| f.descriptor().to_string()).collect(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        loader::{NullLoader, StaticLoader},
        rust,
        test_support::stub_factory,
    };

    fn registry() -> BackendRegistry {
        let mut registry = BackendRegistry::new(rust::factory());
        registry.register(stub_factory("Foo", "Acme.Gen.Foo", &["ts"], ""));
        registry.register(stub_factory("foo", "Other.Gen.Foo", &["ts"], ""));
        registry.register(stub_factory("Py", "Acme.Gen.Py", &["python"], ""));
        registry
    }

    #[test]
    fn ambiguous_name_lists_every_identity() {
        let err = select(&registry(), &NullLoader, Some("Foo"), "ts").unwrap_err();
        let text = err.to_string();

        assert!(matches!(err, SelectionError::Ambiguous { .. }));
        assert!(text.contains("Acme.Gen.Foo"), "got: {text}");
        assert!(text.contains("Other.Gen.Foo"), "got: {text}");
        assert!(text.contains("fully-qualified"), "got: {text}");
    }

    #[test]
    fn fully_qualified_identifier_resolves_ambiguity() {
        let selection = select(&registry(), &NullLoader, Some("Other.Gen.Foo"), "ts").unwrap();
        assert!(matches!(selection, Selection::ByTypeId(_)));
        assert_eq!(selection.factory().descriptor().type_id, "Other.Gen.Foo");
    }

    #[test]
    fn unknown_name_falls_back_to_direct_load() {
        let loader = StaticLoader::new().with_type(stub_factory("Go", "Acme.Gen.Go", &["go"], ""));

        let selection = select(&registry(), &loader, Some("Acme.Gen.Go"), "go").unwrap();
        assert!(matches!(selection, Selection::ByTypeId(_)));

        let err = select(&registry(), &loader, Some("Nope"), "go").unwrap_err();
        assert_eq!(err, SelectionError::NotFound { name: "Nope".into() });
    }

    #[test]
    fn type_identifier_loads_directly_before_the_registry() {
        let loader =
            StaticLoader::new().with_type(stub_factory("Direct", "Acme.Gen.Foo", &["ts"], ""));

        let selection = select(&registry(), &loader, Some("Acme.Gen.Foo"), "ts").unwrap();
        assert!(matches!(selection, Selection::ByTypeId(_)));
        assert_eq!(selection.factory().descriptor().name, "Direct");
    }

    #[test]
    fn language_selection_uses_default_when_zero_or_many_match() {
        let registry = registry();

        let none = select(&registry, &NullLoader, None, "X").unwrap();
        assert!(matches!(
            none,
            Selection::Default {
                reason: DefaultReason::NoLanguageMatch,
                ..
            }
        ));

        let one = select(&registry, &NullLoader, None, "PYTHON").unwrap();
        assert!(matches!(one, Selection::ByLanguage(_)));

        let many = select(&registry, &NullLoader, None, "TS").unwrap();
        let Selection::Default {
            factory,
            reason: DefaultReason::AmbiguousLanguage { candidates },
        } = many
        else {
            panic!("expected ambiguous language fallback");
        };
        assert_eq!(factory.descriptor().name, rust::BACKEND_NAME);
        assert_eq!(candidates.len(), 2);
    }
}
