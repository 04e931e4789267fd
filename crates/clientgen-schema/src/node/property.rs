use crate::prelude::*;

///
/// Property
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association: Option<AssociationInfo>,
}

impl Property {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
            association: None,
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn with_association(mut self, association: AssociationInfo) -> Self {
        self.association = Some(association);
        self
    }
}

///
/// AssociationInfo
///
/// Two properties carrying the same `name` on complementary entities form a
/// bidirectional association; a lone side is unidirectional.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AssociationInfo {
    pub name: String,
    pub this_key: Vec<String>,
    pub other_key: Vec<String>,

    #[serde(default)]
    pub is_foreign_key: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<Inclusion>,
}

impl AssociationInfo {
    #[must_use]
    pub fn new<I, J, S, T>(name: impl Into<String>, this_key: I, other_key: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            this_key: this_key.into_iter().map(Into::into).collect(),
            other_key: other_key.into_iter().map(Into::into).collect(),
            is_foreign_key: false,
            includes: Vec::new(),
        }
    }

    #[must_use]
    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }

    #[must_use]
    pub fn include(mut self, source: impl Into<String>, projected: impl Into<String>) -> Self {
        self.includes.push(Inclusion {
            source: source.into(),
            projected: projected.into(),
        });
        self
    }
}

///
/// Inclusion
/// Denormalizes `source` from the far side of an association as `projected`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Inclusion {
    pub source: String,
    pub projected: String,
}
