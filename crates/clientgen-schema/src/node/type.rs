use crate::prelude::*;
use std::fmt;

///
/// TypeRef
///
/// Declared type of a property, parameter or return value.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Scalar(String),
    Entity(QualifiedName),
    Complex(QualifiedName),
    Collection(Box<TypeRef>),
}

impl TypeRef {
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::Scalar(name.into())
    }

    #[must_use]
    pub fn entity(name: impl Into<QualifiedName>) -> Self {
        Self::Entity(name.into())
    }

    #[must_use]
    pub fn complex(name: impl Into<QualifiedName>) -> Self {
        Self::Complex(name.into())
    }

    #[must_use]
    pub fn collection(of: Self) -> Self {
        Self::Collection(Box::new(of))
    }

    /// The type with every collection layer removed.
    #[must_use]
    pub fn element(&self) -> &Self {
        match self {
            Self::Collection(inner) => inner.element(),
            other => other,
        }
    }

    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Element entity name, looking through collections.
    #[must_use]
    pub fn entity_name(&self) -> Option<&QualifiedName> {
        match self.element() {
            Self::Entity(name) => Some(name),
            _ => None,
        }
    }

    /// Element complex type name, looking through collections.
    #[must_use]
    pub fn complex_name(&self) -> Option<&QualifiedName> {
        match self.element() {
            Self::Complex(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(name) => write!(f, "{name}"),
            Self::Entity(name) | Self::Complex(name) => write!(f, "{name}"),
            Self::Collection(inner) => write!(f, "Collection<{inner}>"),
        }
    }
}
