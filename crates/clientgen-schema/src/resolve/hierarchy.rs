//! Visible inheritance: roots, bases, derived closures and lifted members.
//!
//! Only exposed entities are emitted. Anything declared on a non-exposed
//! ancestor is re-attributed ("lifted") to the nearest exposed descendant,
//! and key/known-subtype rules are checked against the visible shape.

use crate::{prelude::*, resolve::exposure::Exposure};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

///
/// LiftedProperty
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiftedProperty {
    pub from: QualifiedName,
    pub property: Property,
}

///
/// HierarchyNode
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HierarchyNode {
    pub name: QualifiedName,
    pub visible_root: QualifiedName,
    pub visible_base: Option<QualifiedName>,
    pub derived: Vec<QualifiedName>,

    /// Farthest ancestor first.
    pub lifted: Vec<LiftedProperty>,
    pub key: Vec<String>,
    pub is_abstract: bool,
    pub instantiable: bool,
}

///
/// Hierarchy
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Hierarchy {
    pub nodes: BTreeMap<QualifiedName, HierarchyNode>,
}

impl Hierarchy {
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&HierarchyNode> {
        self.nodes.get(name)
    }

    #[must_use]
    pub fn visible_root(&self, name: &str) -> Option<&QualifiedName> {
        self.node(name).map(|n| &n.visible_root)
    }

    #[must_use]
    pub fn visible_base(&self, name: &str) -> Option<&QualifiedName> {
        self.node(name).and_then(|n| n.visible_base.as_ref())
    }

    #[must_use]
    pub fn is_root(&self, name: &str) -> bool {
        self.node(name).is_some_and(|n| n.visible_base.is_none())
    }

    /// Visible chain from `name` up to its root, `name` first.
    #[must_use]
    pub fn visible_chain(&self, name: &str) -> Vec<&HierarchyNode> {
        let mut out = Vec::new();
        let mut current = self.node(name);
        while let Some(node) = current {
            out.push(node);
            current = node.visible_base.as_ref().and_then(|b| self.node(b.as_str()));
        }

        out
    }
}

/// Resolve the visible hierarchy of every exposed entity of one service.
pub fn resolve_hierarchy(
    graph: &MetadataGraph,
    service: &str,
    exposure: &Exposure,
    errs: &mut ErrorTree,
) -> Hierarchy {
    let mut partial = BTreeMap::new();
    let mut key_offenders = BTreeSet::new();

    // Phase 1: visible base, lifted members and key placement.
    for name in &exposure.entities {
        let Some(entity) = graph.entity(name.as_str()) else {
            continue;
        };
        let ancestors = match graph.ancestors(name.as_str()) {
            Ok(chain) => chain,
            Err(AncestryError::Cycle(at)) => {
                errs.add(ResolveError::InheritanceCycle {
                    service: service.to_string(),
                    entity: at.to_string(),
                });
                continue;
            }
            Err(AncestryError::UnknownBase { entity, base }) => {
                errs.add(ResolveError::UnknownType {
                    service: service.to_string(),
                    name: base.to_string(),
                    referenced_from: entity.to_string(),
                });
                continue;
            }
        };

        let split = ancestors
            .iter()
            .position(|a| exposure.has_entity(a.name.as_str()))
            .unwrap_or(ancestors.len());
        let hidden = &ancestors[..split];
        let visible_base = ancestors.get(split).map(|a| a.name.clone());

        let lifted = hidden
            .iter()
            .rev()
            .flat_map(|a| {
                a.properties.iter().map(|p| LiftedProperty {
                    from: a.name.clone(),
                    property: p.clone(),
                })
            })
            .collect();

        let key = check_keys(
            service,
            entity,
            hidden,
            visible_base.is_none(),
            &mut key_offenders,
            errs,
        );

        partial.insert(
            name.clone(),
            HierarchyNode {
                name: name.clone(),
                visible_root: name.clone(),
                visible_base,
                derived: Vec::new(),
                lifted,
                key,
                is_abstract: entity.is_abstract,
                instantiable: !entity.is_abstract,
            },
        );
    }

    // Phase 2: visible roots follow visible bases to the top.
    let roots: BTreeMap<QualifiedName, QualifiedName> = partial
        .keys()
        .map(|name| {
            let mut root = name;
            while let Some(base) = partial.get(root).and_then(|n| n.visible_base.as_ref()) {
                if !partial.contains_key(base) {
                    break;
                }
                root = base;
            }
            (name.clone(), root.clone())
        })
        .collect();

    // Phase 3: derived closures and instantiability.
    let concrete: BTreeSet<QualifiedName> = partial
        .values()
        .filter(|n| !n.is_abstract)
        .map(|n| n.name.clone())
        .collect();
    let derived: BTreeMap<QualifiedName, Vec<QualifiedName>> = partial
        .keys()
        .map(|name| {
            let closure = partial
                .keys()
                .filter(|d| graph.derives_from(d.as_str(), name.as_str()))
                .cloned()
                .collect();
            (name.clone(), closure)
        })
        .collect();

    for (name, node) in &mut partial {
        if let Some(root) = roots.get(name) {
            node.visible_root = root.clone();
        }
        if let Some(closure) = derived.get(name) {
            node.instantiable = !node.is_abstract || closure.iter().any(|d| concrete.contains(d));
            node.derived = closure.clone();
        }
    }

    // Phase 4: known-subtype declarations.
    check_known_subtypes(graph, service, &partial, errs);

    Hierarchy { nodes: partial }
}

// Returns the effective key for roots; empty otherwise.
fn check_keys(
    service: &str,
    entity: &EntityType,
    hidden: &[&EntityType],
    is_root: bool,
    offenders: &mut BTreeSet<QualifiedName>,
    errs: &mut ErrorTree,
) -> Vec<String> {
    let mut report = |offender: &EntityType, errs: &mut ErrorTree| {
        if offenders.insert(offender.name.clone()) {
            errs.add(ResolveError::KeyOnNonRoot {
                service: service.to_string(),
                entity: offender.name.to_string(),
                fields: offender.key.clone(),
            });
        }
    };

    if is_root {
        // topmost keyed entity wins; anything keyed below it is misplaced
        let mut keyed = hidden
            .iter()
            .rev()
            .copied()
            .chain(std::iter::once(entity))
            .filter(|e| !e.key.is_empty());

        let Some(top) = keyed.next() else {
            errs.add(ResolveError::MissingKey {
                service: service.to_string(),
                entity: entity.name.to_string(),
            });
            return Vec::new();
        };
        for lower in keyed {
            report(lower, errs);
        }

        return top.key.clone();
    }

    for offender in std::iter::once(entity)
        .chain(hidden.iter().copied())
        .filter(|e| !e.key.is_empty())
    {
        report(offender, errs);
    }

    Vec::new()
}

fn check_known_subtypes(
    graph: &MetadataGraph,
    service: &str,
    nodes: &BTreeMap<QualifiedName, HierarchyNode>,
    errs: &mut ErrorTree,
) {
    let mut closures: BTreeMap<&QualifiedName, BTreeSet<QualifiedName>> = BTreeMap::new();

    for node in nodes.values() {
        if let Some(entity) = graph.entity(node.name.as_str()) {
            for subtype in &entity.known_subtypes {
                if graph.entity(subtype.as_str()).is_some()
                    && !graph.derives_from(subtype.as_str(), node.name.as_str())
                {
                    errs.add(ResolveError::InvalidKnownSubtype {
                        service: service.to_string(),
                        entity: node.name.to_string(),
                        subtype: subtype.to_string(),
                    });
                }
            }
        }

        if node.visible_base.is_none() {
            continue;
        }
        let closure = closures
            .entry(&node.visible_root)
            .or_insert_with(|| known_subtype_closure(graph, node.visible_root.as_str()));
        if !closure.contains(&node.name) {
            errs.add(ResolveError::NotKnownSubtype {
                service: service.to_string(),
                entity: node.name.to_string(),
                root: node.visible_root.to_string(),
            });
        }
    }
}

/// Transitive known-subtype set of `root`: declarations on the root and on
/// its ancestors, closed over each declared subtype's own declarations.
#[must_use]
pub fn known_subtype_closure(graph: &MetadataGraph, root: &str) -> BTreeSet<QualifiedName> {
    let mut closure = BTreeSet::new();
    let mut queue: VecDeque<&QualifiedName> = graph
        .entity(root)
        .into_iter()
        .chain(graph.ancestors(root).unwrap_or_default())
        .flat_map(|e| e.known_subtypes.iter())
        .collect();

    while let Some(name) = queue.pop_front() {
        if !closure.insert(name.clone()) {
            continue;
        }
        if let Some(entity) = graph.entity(name.as_str()) {
            queue.extend(entity.known_subtypes.iter());
        }
    }

    closure
}

///
/// TESTS
///
