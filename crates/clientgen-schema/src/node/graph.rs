use crate::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

///
/// MetadataGraph
///
/// Everything the host introspected for one generation request. Nodes are
/// keyed by qualified name and reference each other by name only.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MetadataGraph {
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,

    #[serde(default)]
    pub entities: BTreeMap<QualifiedName, EntityType>,

    #[serde(default)]
    pub complex_types: BTreeMap<QualifiedName, ComplexType>,
}

///
/// AncestryError
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AncestryError {
    Cycle(QualifiedName),
    UnknownBase {
        entity: QualifiedName,
        base: QualifiedName,
    },
}

impl MetadataGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_service(mut self, service: ServiceDescriptor) -> Self {
        self.services.push(service);
        self
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityType) -> Self {
        self.insert_entity(entity);
        self
    }

    #[must_use]
    pub fn with_complex(mut self, complex: ComplexType) -> Self {
        self.insert_complex(complex);
        self
    }

    pub fn insert_entity(&mut self, entity: EntityType) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn insert_complex(&mut self, complex: ComplexType) {
        self.complex_types.insert(complex.name.clone(), complex);
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityType> {
        self.entities.get(name)
    }

    #[must_use]
    pub fn complex(&self, name: &str) -> Option<&ComplexType> {
        self.complex_types.get(name)
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name.as_str() == name)
    }

    /// Base chain of `name`, nearest first, excluding `name` itself.
    pub fn ancestors(&self, name: &str) -> Result<Vec<&EntityType>, AncestryError> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        seen.insert(name.to_string());

        let mut current = self.entity(name).and_then(|e| e.base.as_ref().map(|b| (e, b)));
        while let Some((child, base_name)) = current {
            if !seen.insert(base_name.to_string()) {
                return Err(AncestryError::Cycle(QualifiedName::new(name)));
            }
            let Some(base) = self.entity(base_name.as_str()) else {
                return Err(AncestryError::UnknownBase {
                    entity: child.name.clone(),
                    base: base_name.clone(),
                });
            };
            out.push(base);
            current = base.base.as_ref().map(|b| (base, b));
        }

        Ok(out)
    }

    /// True when `ancestor` appears in the base chain of `name`.
    #[must_use]
    pub fn derives_from(&self, name: &str, ancestor: &str) -> bool {
        self.ancestors(name)
            .is_ok_and(|chain| chain.iter().any(|e| e.name.as_str() == ancestor))
    }

    /// Every entity deriving (transitively) from `name`, in name order.
    #[must_use]
    pub fn descendants(&self, name: &str) -> Vec<&EntityType> {
        self.entities
            .values()
            .filter(|e| self.derives_from(e.name.as_str(), name))
            .collect()
    }

    /// Find a property on `entity` or any ancestor, returning the declaring entity.
    #[must_use]
    pub fn find_property(&self, entity: &str, property: &str) -> Option<(&EntityType, &Property)> {
        let own = self.entity(entity)?;
        std::iter::once(own)
            .chain(self.ancestors(entity).unwrap_or_default())
            .find_map(|e| e.property(property).map(|p| (e, p)))
    }
}
