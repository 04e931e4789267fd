use crate::prelude::*;

///
/// EntityType
///
/// A keyed data type. `base` is a back-reference by name; the graph owns
/// every entity and no entity owns its base.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityType {
    pub name: QualifiedName,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<QualifiedName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,

    #[serde(default)]
    pub properties: Vec<Property>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub known_subtypes: Vec<QualifiedName>,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl EntityType {
    #[must_use]
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            base: None,
            key: Vec::new(),
            properties: Vec::new(),
            known_subtypes: Vec::new(),
            is_abstract: false,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: impl Into<QualifiedName>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub fn with_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_known_subtype(mut self, subtype: impl Into<QualifiedName>) -> Self {
        self.known_subtypes.push(subtype.into());
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn into_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Property declared directly on this entity.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}
