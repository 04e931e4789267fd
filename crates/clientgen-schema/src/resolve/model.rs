use crate::prelude::*;
use std::collections::BTreeMap;

///
/// ResolvedModel
///
/// Emission-ready view of a metadata graph. Built once per generation run,
/// read by backends, then dropped.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct ResolvedModel {
    pub services: Vec<ResolvedService>,
    pub entities: BTreeMap<QualifiedName, ResolvedEntity>,
    pub complex_types: BTreeMap<QualifiedName, ResolvedComplexType>,
}

impl ResolvedModel {
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&ResolvedEntity> {
        self.entities.get(name)
    }

    #[must_use]
    pub fn complex(&self, name: &str) -> Option<&ResolvedComplexType> {
        self.complex_types.get(name)
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ResolvedService> {
        self.services.iter().find(|s| s.name.as_str() == name)
    }

    /// Entities in emission order: each root followed by its derived closure,
    /// roots in name order.
    #[must_use]
    pub fn entities_in_emission_order(&self) -> Vec<&ResolvedEntity> {
        let mut out = Vec::with_capacity(self.entities.len());
        for root in self.entities.values().filter(|e| e.is_root()) {
            out.push(root);
            out.extend(root.derived.iter().filter_map(|d| self.entity(d.as_str())));
        }

        out
    }
}

///
/// ResolvedService
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedService {
    pub name: QualifiedName,
    pub context: QualifiedName,
    pub entity_sets: Vec<EntitySet>,
    pub operations: Vec<ResolvedOperation>,
    pub entities: Vec<QualifiedName>,
    pub complex_types: Vec<QualifiedName>,
    pub annotations: Vec<Annotation>,
}

///
/// EntitySet
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EntitySet {
    pub name: String,
    pub entity: QualifiedName,
}

///
/// ResolvedOperation
///
/// `member` is the name the operation takes on the emitted context, or
/// `None` when it surfaces elsewhere (entity methods, change-set ops).
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedOperation {
    pub name: String,
    pub kind: OperationKind,
    pub member: Option<String>,
    pub returns: Option<TypeRef>,
    pub parameters: Vec<Parameter>,
    pub annotations: Vec<Annotation>,
}

///
/// ResolvedEntity
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedEntity {
    pub name: QualifiedName,
    pub visible_root: QualifiedName,
    pub visible_base: Option<QualifiedName>,

    /// Exposed entities deriving from this one, in name order.
    pub derived: Vec<QualifiedName>,

    /// Effective key; only populated on visible roots.
    pub key: Vec<String>,
    pub is_abstract: bool,

    /// False for abstract entities with no concrete exposed descendant.
    pub instantiable: bool,

    /// Inherited members first (`declare_here == false`), then own members.
    pub members: Vec<ResolvedProperty>,

    /// Entity-bound custom methods.
    pub methods: Vec<String>,
    pub annotations: Vec<Annotation>,
}

impl ResolvedEntity {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.visible_base.is_none()
    }

    /// Members this entity declares itself (declared, lifted, projected).
    pub fn own_members(&self) -> impl Iterator<Item = &ResolvedProperty> {
        self.members.iter().filter(|m| m.declare_here)
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&ResolvedProperty> {
        self.members.iter().find(|m| m.name == name)
    }
}

///
/// ResolvedComplexType
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedComplexType {
    pub name: QualifiedName,
    pub members: Vec<Property>,
    pub annotations: Vec<Annotation>,
}

///
/// ResolvedProperty
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedProperty {
    pub name: String,
    pub ty: TypeRef,

    /// Entity whose source declares the property (may be non-exposed).
    pub declared_on: QualifiedName,
    pub origin: PropertyOrigin,

    /// False when the member is inherited from the visible base.
    pub declare_here: bool,
    pub annotations: Vec<Annotation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub association: Option<ResolvedAssociation>,
}

///
/// PropertyOrigin
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyOrigin {
    Declared,
    Lifted {
        from: QualifiedName,
    },
    Projected {
        via: String,
        source: String,
        order: usize,
    },
}

///
/// ResolvedAssociation
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedAssociation {
    pub name: String,
    pub target: QualifiedName,
    pub this_key: Vec<String>,
    pub other_key: Vec<String>,
    pub is_foreign_key: bool,
    pub is_collection: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<PropertyRef>,
}

///
/// PropertyRef
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PropertyRef {
    pub entity: QualifiedName,
    pub property: String,
}
