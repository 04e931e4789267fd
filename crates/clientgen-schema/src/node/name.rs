use crate::prelude::*;
use derive_more::Display;
use std::borrow::Borrow;

///
/// QualifiedName
///
/// Dot-separated type identity, e.g. `Shop.Catalog.Product`. Nodes refer to
/// each other by name only; the graph owns every node.
///

#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct QualifiedName(String);

impl QualifiedName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last `.`, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(ns, _)| ns)
    }

    /// The last segment.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, name)| name)
    }

    /// A sibling name in the same namespace.
    #[must_use]
    pub fn sibling(&self, short_name: &str) -> Self {
        match self.namespace() {
            Some(ns) => Self(format!("{ns}.{short_name}")),
            None => Self(short_name.to_string()),
        }
    }

    /// True when this name lives in `namespace` or one of its children.
    #[must_use]
    pub fn is_within(&self, namespace: &str) -> bool {
        self.0
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl Borrow<str> for QualifiedName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self(s)
    }
}
