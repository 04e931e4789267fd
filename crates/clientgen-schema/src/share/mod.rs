//! Shared-type classification.
//!
//! A type is already available to the client either by reference (a common
//! framework namespace or a registered shared module) or by source (one of
//! its defining files is compiled into the client too). Anything the
//! locator cannot answer for is `Unknown`, never `NotShared`.

pub mod annotation;

pub use annotation::{
    AnnotationPlan, AnnotationReview, FindingLevel, SharingFinding, review_annotation,
};

use crate::prelude::*;
use derive_more::Display;
use std::{
    cell::RefCell,
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::debug;

///
/// SharedState
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedState {
    SharedBySource,
    SharedByReference,
    NotShared,
    Unknown,
}

impl SharedState {
    #[must_use]
    pub const fn is_shared(self) -> bool {
        matches!(self, Self::SharedBySource | Self::SharedByReference)
    }
}

///
/// SourceLookup
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SourceLookup {
    Found(Vec<PathBuf>),
    NotFound,

    /// The locator has no source information at all.
    Unavailable,
}

///
/// TypeLocator
///
/// Host-provided answers about where types and members are defined.
///

pub trait TypeLocator {
    /// Defining module of a type, when known.
    fn module_of(&self, ty: &QualifiedName) -> Option<String>;

    fn type_sources(&self, ty: &QualifiedName) -> SourceLookup;

    fn member_sources(&self, owner: &QualifiedName, member: &str) -> SourceLookup;
}

///
/// NoLocator
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoLocator;

impl TypeLocator for NoLocator {
    fn module_of(&self, _: &QualifiedName) -> Option<String> {
        None
    }

    fn type_sources(&self, _: &QualifiedName) -> SourceLookup {
        SourceLookup::Unavailable
    }

    fn member_sources(&self, _: &QualifiedName, _: &str) -> SourceLookup {
        SourceLookup::Unavailable
    }
}

///
/// StaticLocator
///
/// Table-driven locator. Types without an entry have no sources.
///

#[derive(Clone, Debug, Default)]
pub struct StaticLocator {
    modules: BTreeMap<QualifiedName, String>,
    types: BTreeMap<QualifiedName, Vec<PathBuf>>,
    members: BTreeMap<(QualifiedName, String), Vec<PathBuf>>,
}

impl StaticLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_module(mut self, ty: impl Into<QualifiedName>, module: impl Into<String>) -> Self {
        self.modules.insert(ty.into(), module.into());
        self
    }

    #[must_use]
    pub fn with_type_source(mut self, ty: impl Into<QualifiedName>, path: impl Into<PathBuf>) -> Self {
        self.types.entry(ty.into()).or_default().push(path.into());
        self
    }

    #[must_use]
    pub fn with_member_source(
        mut self,
        owner: impl Into<QualifiedName>,
        member: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.members
            .entry((owner.into(), member.into()))
            .or_default()
            .push(path.into());
        self
    }
}

impl TypeLocator for StaticLocator {
    fn module_of(&self, ty: &QualifiedName) -> Option<String> {
        self.modules.get(ty).cloned()
    }

    fn type_sources(&self, ty: &QualifiedName) -> SourceLookup {
        self.types
            .get(ty)
            .map_or(SourceLookup::NotFound, |paths| SourceLookup::Found(paths.clone()))
    }

    fn member_sources(&self, owner: &QualifiedName, member: &str) -> SourceLookup {
        self.members
            .get(&(owner.clone(), member.to_string()))
            .map_or(SourceLookup::NotFound, |paths| SourceLookup::Found(paths.clone()))
    }
}

///
/// ClassifierConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Namespaces every client can reference (framework types).
    pub common_namespaces: Vec<String>,

    /// Modules registered as shared references.
    pub shared_modules: Vec<String>,

    /// Source files compiled into the client.
    pub client_sources: Vec<PathBuf>,
}

impl ClassifierConfig {
    fn compiled_into_client(&self, paths: &[PathBuf]) -> bool {
        paths
            .iter()
            .any(|p| self.client_sources.iter().any(|c| same_file(c, p)))
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}

///
/// SharedTypeClassifier
///
/// Answers are cached for the classifier's lifetime, one generation request.
///

pub struct SharedTypeClassifier<'a> {
    locator: &'a dyn TypeLocator,
    config: &'a ClassifierConfig,
    types: RefCell<BTreeMap<QualifiedName, SharedState>>,
    members: RefCell<BTreeMap<(QualifiedName, String), SharedState>>,
}

impl<'a> SharedTypeClassifier<'a> {
    #[must_use]
    pub fn new(locator: &'a dyn TypeLocator, config: &'a ClassifierConfig) -> Self {
        Self {
            locator,
            config,
            types: RefCell::default(),
            members: RefCell::default(),
        }
    }

    pub fn classify_type(&self, name: &QualifiedName) -> SharedState {
        if let Some(state) = self.types.borrow().get(name) {
            return *state;
        }

        let state = self.classify_type_uncached(name);
        debug!(ty = %name, %state, "classified type");
        self.types.borrow_mut().insert(name.clone(), state);

        state
    }

    fn classify_type_uncached(&self, name: &QualifiedName) -> SharedState {
        if self.config.common_namespaces.iter().any(|ns| name.is_within(ns)) {
            return SharedState::SharedByReference;
        }
        if let Some(module) = self.locator.module_of(name)
            && self.config.shared_modules.contains(&module)
        {
            return SharedState::SharedByReference;
        }

        self.from_sources(self.locator.type_sources(name))
    }

    pub fn classify_member(&self, owner: &QualifiedName, member: &str) -> SharedState {
        let key = (owner.clone(), member.to_string());
        if let Some(state) = self.members.borrow().get(&key) {
            return *state;
        }

        let state = match self.classify_type(owner) {
            SharedState::SharedByReference => SharedState::SharedByReference,
            _ => self.from_sources(self.locator.member_sources(owner, member)),
        };
        self.members.borrow_mut().insert(key, state);

        state
    }

    fn from_sources(&self, lookup: SourceLookup) -> SharedState {
        match lookup {
            SourceLookup::Found(paths) if self.config.compiled_into_client(&paths) => {
                SharedState::SharedBySource
            }
            SourceLookup::Found(_) | SourceLookup::NotFound => SharedState::NotShared,
            SourceLookup::Unavailable => SharedState::Unknown,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn config() -> ClassifierConfig {
        ClassifierConfig {
            common_namespaces: vec!["System".into()],
            shared_modules: vec!["Shop.Contracts".into()],
            client_sources: vec![PathBuf::from("shared/money.rs")],
        }
    }

    fn locator() -> StaticLocator {
        StaticLocator::new()
            .with_module("Shop.Contracts.Sku", "Shop.Contracts")
            .with_type_source("Shop.Money", "shared/money.rs")
            .with_type_source("Shop.Secret", "server/secret.rs")
            .with_member_source("Shop.Order", "Total", "shared/money.rs")
    }

    #[test]
    fn classifies_by_reference_source_and_absence() {
        let config = config();
        let locator = locator();
        let classifier = SharedTypeClassifier::new(&locator, &config);

        let check = |name: &str| classifier.classify_type(&name.into());
        assert_eq!(check("System.String"), SharedState::SharedByReference);
        assert_eq!(check("Shop.Contracts.Sku"), SharedState::SharedByReference);
        assert_eq!(check("Shop.Money"), SharedState::SharedBySource);
        assert_eq!(check("Shop.Secret"), SharedState::NotShared);
        assert_eq!(check("Shop.Other"), SharedState::NotShared);
    }

    #[test]
    fn unavailable_sources_are_unknown_never_not_shared() {
        let config = config();
        let classifier = SharedTypeClassifier::new(&NoLocator, &config);

        assert_eq!(classifier.classify_type(&"Shop.Money".into()), SharedState::Unknown);
        assert_eq!(
            classifier.classify_type(&"System.Guid".into()),
            SharedState::SharedByReference
        );
        assert_eq!(
            classifier.classify_member(&"Shop.Order".into(), "Total"),
            SharedState::Unknown
        );
    }

    #[test]
    fn members_follow_their_own_sources() {
        let config = config();
        let locator = locator();
        let classifier = SharedTypeClassifier::new(&locator, &config);
        let order = QualifiedName::new("Shop.Order");

        assert_eq!(classifier.classify_member(&order, "Total"), SharedState::SharedBySource);
        assert_eq!(classifier.classify_member(&order, "Notes"), SharedState::NotShared);
        assert_eq!(
            classifier.classify_member(&"System.Text".into(), "Length"),
            SharedState::SharedByReference
        );
    }

    struct CountingLocator {
        calls: Cell<usize>,
    }

    impl TypeLocator for CountingLocator {
        fn module_of(&self, _: &QualifiedName) -> Option<String> {
            None
        }

        fn type_sources(&self, _: &QualifiedName) -> SourceLookup {
            self.calls.set(self.calls.get() + 1);
            SourceLookup::NotFound
        }

        fn member_sources(&self, _: &QualifiedName, _: &str) -> SourceLookup {
            SourceLookup::NotFound
        }
    }

    #[test]
    fn answers_are_cached_per_classifier() {
        let config = ClassifierConfig::default();
        let locator = CountingLocator { calls: Cell::new(0) };
        let classifier = SharedTypeClassifier::new(&locator, &config);
        let name = QualifiedName::new("Shop.Order");

        classifier.classify_type(&name);
        classifier.classify_type(&name);
        assert_eq!(locator.calls.get(), 1);

        // a fresh classifier starts empty
        let again = SharedTypeClassifier::new(&locator, &config);
        again.classify_type(&name);
        assert_eq!(locator.calls.get(), 2);
    }
}
