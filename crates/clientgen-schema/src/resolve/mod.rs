//! Staged resolution of a metadata graph.
//!
//! Each service resolves independently through four phases: exposure,
//! visible hierarchy, associations (with projections), and naming. Errors
//! accumulate in an [`ErrorTree`]; any error drops that service only.

pub mod association;
pub mod exposure;
pub mod hierarchy;
pub mod model;
pub mod naming;

pub use model::*;

use crate::{
    DEFAULT_MAX_PROJECTION_DEPTH,
    prelude::*,
    resolve::{
        association::{Associations, resolve_associations},
        exposure::compute_exposure,
        hierarchy::{Hierarchy, HierarchyNode, resolve_hierarchy},
    },
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

///
/// RawAssociationPolicy
///
/// What to do with an association annotation written directly on an
/// association property.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawAssociationPolicy {
    #[default]
    Reject,
    Strip,
}

///
/// ResolveOptions
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ResolveOptions {
    pub max_projection_depth: usize,

    /// Annotation type names (qualified or short) that describe associations.
    pub association_annotation_types: Vec<String>,
    pub raw_association_policy: RawAssociationPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_projection_depth: DEFAULT_MAX_PROJECTION_DEPTH,
            association_annotation_types: vec!["Association".to_string()],
            raw_association_policy: RawAssociationPolicy::default(),
        }
    }
}

impl ResolveOptions {
    #[must_use]
    pub fn is_association_annotation(&self, type_name: &QualifiedName) -> bool {
        self.association_annotation_types
            .iter()
            .any(|t| t == type_name.as_str() || t == type_name.short_name())
    }
}

///
/// ServiceResolution
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceResolution {
    pub service: ResolvedService,
    pub entities: Vec<ResolvedEntity>,
    pub complex_types: Vec<ResolvedComplexType>,
}

///
/// ServiceFailure
///

#[derive(Clone, Debug)]
pub struct ServiceFailure {
    pub service: QualifiedName,
    pub errors: ErrorTree,
}

///
/// ShapeConflict
///
/// A type resolved by two services to different shapes. The owner's shape
/// is kept.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShapeConflict {
    pub name: QualifiedName,
    pub owner: QualifiedName,
    pub service: QualifiedName,
}

///
/// ResolveOutcome
///

#[derive(Clone, Debug, Default)]
pub struct ResolveOutcome {
    pub model: ResolvedModel,
    pub failures: Vec<ServiceFailure>,
    pub conflicts: Vec<ShapeConflict>,
}

impl ResolveOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.conflicts.is_empty()
    }
}

/// Resolve every service of the graph, merging the successful ones.
#[must_use]
pub fn resolve_graph(graph: &MetadataGraph, options: &ResolveOptions) -> ResolveOutcome {
    let mut outcome = ResolveOutcome::default();
    let mut owners: BTreeMap<QualifiedName, QualifiedName> = BTreeMap::new();

    for service in &graph.services {
        match resolve_service(graph, service, options) {
            Ok(resolution) => merge(&mut outcome, &mut owners, resolution),
            Err(errors) => {
                warn!(
                    service = %service.name,
                    errors = errors.len(),
                    "service resolution failed"
                );
                outcome.failures.push(ServiceFailure {
                    service: service.name.clone(),
                    errors,
                });
            }
        }
    }

    info!(
        services = outcome.model.services.len(),
        entities = outcome.model.entities.len(),
        complex_types = outcome.model.complex_types.len(),
        failures = outcome.failures.len(),
        "resolved metadata graph"
    );

    outcome
}

fn merge(
    outcome: &mut ResolveOutcome,
    owners: &mut BTreeMap<QualifiedName, QualifiedName>,
    resolution: ServiceResolution,
) {
    let service = resolution.service.name.clone();
    let model = &outcome.model;

    // a name may only be reused for the same kind of type
    let mut errs = ErrorTree::new();
    let context = &resolution.service.context;
    if owners.contains_key(context) {
        errs.add(ResolveError::TypeNameCollision {
            service: service.to_string(),
            name: context.to_string(),
        });
    }
    for entity in &resolution.entities {
        let clash = model.complex_types.contains_key(&entity.name)
            || model.services.iter().any(|s| s.context == entity.name);
        if clash {
            errs.add(ResolveError::TypeNameCollision {
                service: service.to_string(),
                name: entity.name.to_string(),
            });
        }
    }
    for complex in &resolution.complex_types {
        let clash = model.entities.contains_key(&complex.name)
            || model.services.iter().any(|s| s.context == complex.name);
        if clash {
            errs.add(ResolveError::TypeNameCollision {
                service: service.to_string(),
                name: complex.name.to_string(),
            });
        }
    }
    if !errs.is_empty() {
        warn!(service = %service, "emitted type names collide with an earlier service");
        outcome.failures.push(ServiceFailure {
            service,
            errors: errs,
        });
        return;
    }

    owners.insert(context.clone(), service.clone());

    for entity in resolution.entities {
        match outcome.model.entities.get(&entity.name) {
            Some(existing) if *existing != entity => {
                let owner = owners.get(&entity.name).cloned().unwrap_or_else(|| service.clone());
                warn!(
                    entity = %entity.name,
                    owner = %owner,
                    service = %service,
                    "entity resolved to a different shape; keeping the first"
                );
                outcome.conflicts.push(ShapeConflict {
                    name: entity.name,
                    owner,
                    service: service.clone(),
                });
            }
            Some(_) => {}
            None => {
                owners.insert(entity.name.clone(), service.clone());
                outcome.model.entities.insert(entity.name.clone(), entity);
            }
        }
    }

    for complex in resolution.complex_types {
        outcome
            .model
            .complex_types
            .entry(complex.name.clone())
            .or_insert(complex);
    }

    outcome.model.services.push(resolution.service);
}

/// Resolve one service. Every fatal problem found is returned, not just the
/// first.
pub fn resolve_service(
    graph: &MetadataGraph,
    service: &ServiceDescriptor,
    options: &ResolveOptions,
) -> Result<ServiceResolution, ErrorTree> {
    let name = service.name.as_str();
    let mut errs = ErrorTree::new();

    let exposure = compute_exposure(graph, service, &mut errs);
    debug!(
        service = name,
        entities = exposure.entities.len(),
        complex_types = exposure.complex_types.len(),
        "computed exposure"
    );

    let hierarchy = resolve_hierarchy(graph, name, &exposure, &mut errs);
    let associations =
        resolve_associations(graph, name, &exposure, &hierarchy, options, &mut errs);

    let mut methods: BTreeMap<&QualifiedName, Vec<String>> = BTreeMap::new();
    for op in &service.operations {
        if let Some(entity) = op.bound_entity() {
            methods.entry(entity).or_default().push(op.name.clone());
        }
    }

    let builder = EntityBuilder {
        graph,
        hierarchy: &hierarchy,
        associations: &associations,
        options,
    };
    let entities = builder.build_all(&methods);

    let complex_types: Vec<ResolvedComplexType> = exposure
        .complex_types
        .iter()
        .filter_map(|n| graph.complex(n.as_str()))
        .map(|c| ResolvedComplexType {
            name: c.name.clone(),
            members: c.properties.clone(),
            annotations: c.annotations.clone(),
        })
        .collect();

    let resolved = ResolvedService {
        name: service.name.clone(),
        context: service.context_name(),
        entity_sets: hierarchy
            .nodes
            .values()
            .filter(|n| n.visible_base.is_none())
            .map(|n| EntitySet {
                name: naming::entity_set_name(&n.name),
                entity: n.name.clone(),
            })
            .collect(),
        operations: service.operations.iter().map(resolve_operation).collect(),
        entities: entities.iter().map(|e| e.name.clone()).collect(),
        complex_types: complex_types.iter().map(|c| c.name.clone()).collect(),
        annotations: service.annotations.clone(),
    };

    naming::check_context_members(&resolved, &mut errs);
    for entity in &entities {
        naming::check_entity_members(name, entity, &mut errs);
    }
    naming::check_type_names(
        name,
        std::iter::once(&resolved.context)
            .chain(resolved.entities.iter())
            .chain(resolved.complex_types.iter()),
        &mut errs,
    );

    errs.result()?;
    debug!(service = name, "service resolved");

    Ok(ServiceResolution {
        service: resolved,
        entities,
        complex_types,
    })
}

fn resolve_operation(op: &Operation) -> ResolvedOperation {
    let member = match op.kind {
        OperationKind::Query => Some(format!("{}Query", op.name)),
        OperationKind::Invoke => Some(op.name.clone()),
        OperationKind::Custom if op.bound_entity().is_none() => Some(op.name.clone()),
        OperationKind::Custom
        | OperationKind::Insert
        | OperationKind::Update
        | OperationKind::Delete => None,
    };

    ResolvedOperation {
        name: op.name.clone(),
        kind: op.kind,
        member,
        returns: op.returns.clone(),
        parameters: op.parameters.clone(),
        annotations: op.annotations.clone(),
    }
}

///
/// EntityBuilder
///

struct EntityBuilder<'a> {
    graph: &'a MetadataGraph,
    hierarchy: &'a Hierarchy,
    associations: &'a Associations,
    options: &'a ResolveOptions,
}

impl EntityBuilder<'_> {
    // Bases are built before their derived entities so inherited members
    // can be copied down.
    fn build_all(&self, methods: &BTreeMap<&QualifiedName, Vec<String>>) -> Vec<ResolvedEntity> {
        let mut order: Vec<&HierarchyNode> = self.hierarchy.nodes.values().collect();
        order.sort_by_key(|n| self.hierarchy.visible_chain(n.name.as_str()).len());

        let mut built: BTreeMap<QualifiedName, ResolvedEntity> = BTreeMap::new();
        for node in order {
            let inherited = node
                .visible_base
                .as_ref()
                .and_then(|b| built.get(b))
                .map(|base| {
                    base.members
                        .iter()
                        .cloned()
                        .map(|mut m| {
                            m.declare_here = false;
                            m
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            let entity = self.build(node, inherited, methods);
            built.insert(entity.name.clone(), entity);
        }

        built.into_values().collect()
    }

    fn build(
        &self,
        node: &HierarchyNode,
        mut members: Vec<ResolvedProperty>,
        methods: &BTreeMap<&QualifiedName, Vec<String>>,
    ) -> ResolvedEntity {
        let entity = self.graph.entity(node.name.as_str());

        for lifted in &node.lifted {
            members.push(self.member(
                node,
                &lifted.property,
                &lifted.from,
                PropertyOrigin::Lifted {
                    from: lifted.from.clone(),
                },
            ));
        }
        for prop in entity.iter().flat_map(|e| e.properties.iter()) {
            members.push(self.member(node, prop, &node.name, PropertyOrigin::Declared));
        }
        for projection in self.associations.projections_of(node.name.as_str()) {
            members.push(ResolvedProperty {
                name: projection.name.clone(),
                ty: projection.ty.clone(),
                declared_on: node.name.clone(),
                origin: PropertyOrigin::Projected {
                    via: projection.via.clone(),
                    source: projection.source.clone(),
                    order: projection.order,
                },
                declare_here: true,
                annotations: Vec::new(),
                association: None,
            });
        }

        ResolvedEntity {
            name: node.name.clone(),
            visible_root: node.visible_root.clone(),
            visible_base: node.visible_base.clone(),
            derived: node.derived.clone(),
            key: node.key.clone(),
            is_abstract: node.is_abstract,
            instantiable: node.instantiable,
            members,
            methods: methods.get(&node.name).cloned().unwrap_or_default(),
            annotations: entity.map(|e| e.annotations.clone()).unwrap_or_default(),
        }
    }

    fn member(
        &self,
        node: &HierarchyNode,
        prop: &Property,
        declared_on: &QualifiedName,
        origin: PropertyOrigin,
    ) -> ResolvedProperty {
        let association = self.associations.get(&node.name, &prop.name).cloned();
        let strip = association.is_some()
            && self.options.raw_association_policy == RawAssociationPolicy::Strip;
        let annotations = prop
            .annotations
            .iter()
            .filter(|a| !(strip && self.options.is_association_annotation(&a.type_name)))
            .cloned()
            .collect();

        ResolvedProperty {
            name: prop.name.clone(),
            ty: prop.ty.clone(),
            declared_on: declared_on.clone(),
            origin,
            declare_here: true,
            annotations,
            association,
        }
    }
}

///
/// TESTS
///
