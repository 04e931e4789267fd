use crate::prelude::*;
use derive_more::Display;

///
/// OperationKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[remain::sorted]
pub enum OperationKind {
    /// Entity-bound method; the first parameter names the entity.
    Custom,
    Delete,
    Insert,
    Invoke,
    Query,
    Update,
}

///
/// Operation
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Operation {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            returns: None,
            parameters: Vec::new(),
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn query(name: impl Into<String>, returns: TypeRef) -> Self {
        Self::new(name, OperationKind::Query).returning(returns)
    }

    #[must_use]
    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.returns = Some(ty);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        });
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Entity a custom method is bound to (its first parameter).
    #[must_use]
    pub fn bound_entity(&self) -> Option<&QualifiedName> {
        if self.kind != OperationKind::Custom {
            return None;
        }

        self.parameters.first().and_then(|p| match &p.ty {
            TypeRef::Entity(name) => Some(name),
            _ => None,
        })
    }

    /// Every type mentioned by the signature.
    pub fn signature_types(&self) -> impl Iterator<Item = &TypeRef> {
        self.returns
            .iter()
            .chain(self.parameters.iter().map(|p| &p.ty))
    }
}

///
/// Parameter
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}
