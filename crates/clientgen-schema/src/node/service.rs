use crate::{CONTEXT_SUFFIX, SERVICE_SUFFIX, prelude::*};

///
/// ServiceDescriptor
///
/// One exposed service. `entities` lists types exposed explicitly; the rest
/// of the exposure is derived from operation signatures and associations.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    pub name: QualifiedName,

    #[serde(default)]
    pub operations: Vec<Operation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<QualifiedName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl ServiceDescriptor {
    #[must_use]
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
            entities: Vec::new(),
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<QualifiedName>) -> Self {
        self.entities.push(entity.into());
        self
    }

    /// Qualified name of the generated context type (`FooService` -> `FooContext`).
    #[must_use]
    pub fn context_name(&self) -> QualifiedName {
        let short = self.name.short_name();
        let stem = short
            .strip_suffix(SERVICE_SUFFIX)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(short);

        self.name.sibling(&format!("{stem}{CONTEXT_SUFFIX}"))
    }
}
