//! Association pairing and inclusion projections.
//!
//! Pairing looks for the complement of every association member on the
//! associated entity, its ancestors and its descendants (exposed or not).
//! Projections are resolved in rounds: direct members first, then members
//! projected in earlier rounds, until nothing changes.

use crate::{
    prelude::*,
    resolve::{
        RawAssociationPolicy,
        exposure::Exposure,
        hierarchy::Hierarchy,
        model::{PropertyRef, ResolvedAssociation},
    },
};
use std::collections::{BTreeMap, BTreeSet};

///
/// Projection
/// A synthetic member added to `holder` by an inclusion directive.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Projection {
    pub name: String,
    pub ty: TypeRef,
    pub via: String,
    pub source: String,

    /// 1 for direct sources, n + 1 when sourced from an order-n projection.
    pub order: usize,
}

///
/// Associations
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Associations {
    pub resolved: BTreeMap<PropertyRef, ResolvedAssociation>,
    pub projections: BTreeMap<QualifiedName, Vec<Projection>>,
}

impl Associations {
    #[must_use]
    pub fn get(&self, entity: &QualifiedName, property: &str) -> Option<&ResolvedAssociation> {
        self.resolved.get(&PropertyRef {
            entity: entity.clone(),
            property: property.to_string(),
        })
    }

    #[must_use]
    pub fn projections_of(&self, entity: &str) -> &[Projection] {
        self.projections.get(entity).map_or(&[], Vec::as_slice)
    }
}

// An association member as seen from the exposed entity that emits it.
struct Site<'a> {
    holder: &'a QualifiedName,
    declared_on: &'a QualifiedName,
    property: &'a Property,
    info: &'a AssociationInfo,
}

struct PendingProjection {
    holder: QualifiedName,
    via: String,
    target: QualifiedName,
    source: String,
    projected: String,
}

///
/// Resolver
///

struct Resolver<'a> {
    graph: &'a MetadataGraph,
    service: &'a str,
    exposure: &'a Exposure,
    hierarchy: &'a Hierarchy,
    options: &'a ResolveOptions,
}

/// Pair association members and resolve their inclusion projections.
pub fn resolve_associations(
    graph: &MetadataGraph,
    service: &str,
    exposure: &Exposure,
    hierarchy: &Hierarchy,
    options: &ResolveOptions,
    errs: &mut ErrorTree,
) -> Associations {
    let resolver = Resolver {
        graph,
        service,
        exposure,
        hierarchy,
        options,
    };

    let mut out = Associations::default();
    let mut pending = Vec::new();

    for node in hierarchy.nodes.values() {
        let Some(entity) = graph.entity(node.name.as_str()) else {
            continue;
        };
        let declared = entity.properties.iter().map(|p| (&entity.name, p));
        let lifted = node.lifted.iter().map(|l| (&l.from, &l.property));

        for (declared_on, property) in lifted.chain(declared) {
            let Some(info) = &property.association else {
                continue;
            };
            let site = Site {
                holder: &node.name,
                declared_on,
                property,
                info,
            };

            resolver.check_raw_annotations(&site, errs);
            let Some(resolved) = resolver.resolve_site(&site, errs) else {
                continue;
            };

            for inclusion in &info.includes {
                pending.push(PendingProjection {
                    holder: node.name.clone(),
                    via: property.name.clone(),
                    target: resolved.target.clone(),
                    source: inclusion.source.clone(),
                    projected: inclusion.projected.clone(),
                });
            }
            out.resolved.insert(
                PropertyRef {
                    entity: node.name.clone(),
                    property: property.name.clone(),
                },
                resolved,
            );
        }
    }

    out.projections = resolver.resolve_projections(pending, errs);

    out
}

impl Resolver<'_> {
    fn site_error(&self, site: &Site<'_>, reason: impl Into<String>) -> ResolveError {
        ResolveError::AssociationTypeIncompatible {
            service: self.service.to_string(),
            entity: site.holder.to_string(),
            property: site.property.name.clone(),
            reason: reason.into(),
        }
    }

    fn check_raw_annotations(&self, site: &Site<'_>, errs: &mut ErrorTree) {
        if self.options.raw_association_policy != RawAssociationPolicy::Reject {
            return;
        }
        for annotation in &site.property.annotations {
            if self.options.is_association_annotation(&annotation.type_name) {
                errs.add(ResolveError::RawAssociationAnnotation {
                    service: self.service.to_string(),
                    entity: site.holder.to_string(),
                    property: site.property.name.clone(),
                    annotation: annotation.type_name.to_string(),
                });
            }
        }
    }

    fn resolve_site(&self, site: &Site<'_>, errs: &mut ErrorTree) -> Option<ResolvedAssociation> {
        let property = site.property;
        let info = site.info;

        let TypeRef::Entity(target) = property.ty.element() else {
            errs.add(self.site_error(site, format!("type {} is not an entity type", property.ty)));
            return None;
        };
        if self.graph.entity(target.as_str()).is_none() {
            errs.add(ResolveError::UnknownType {
                service: self.service.to_string(),
                name: target.to_string(),
                referenced_from: format!("{}.{}", site.holder, property.name),
            });
            return None;
        }

        // key alignment
        if info.this_key.is_empty() || info.this_key.len() != info.other_key.len() {
            errs.add(ResolveError::AssociationKeyCount {
                service: self.service.to_string(),
                entity: site.holder.to_string(),
                property: property.name.clone(),
                this_count: info.this_key.len(),
                other_count: info.other_key.len(),
            });
            return None;
        }

        let mut keys_ok = true;
        for (this_key, other_key) in info.this_key.iter().zip(&info.other_key) {
            let this_prop = self.key_property(site, site.holder, this_key, errs);
            let other_prop = self.key_property(site, target, other_key, errs);
            match (this_prop, other_prop) {
                (Some(a), Some(b)) if a.ty != b.ty => {
                    errs.add(ResolveError::AssociationKeyType {
                        service: self.service.to_string(),
                        entity: site.holder.to_string(),
                        property: property.name.clone(),
                        this_key: this_key.clone(),
                        this_ty: a.ty.to_string(),
                        other_key: other_key.clone(),
                        other_ty: b.ty.to_string(),
                    });
                    keys_ok = false;
                }
                (Some(_), Some(_)) => {}
                _ => keys_ok = false,
            }
        }
        if !keys_ok {
            return None;
        }

        let partner = self.pair(site, target, errs)?;

        Some(ResolvedAssociation {
            name: info.name.clone(),
            target: target.clone(),
            this_key: info.this_key.clone(),
            other_key: info.other_key.clone(),
            is_foreign_key: info.is_foreign_key,
            is_collection: property.ty.is_collection(),
            partner,
        })
    }

    fn key_property(
        &self,
        site: &Site<'_>,
        on: &QualifiedName,
        key: &str,
        errs: &mut ErrorTree,
    ) -> Option<&Property> {
        let found = self.graph.find_property(on.as_str(), key).map(|(_, p)| p);
        if found.is_none() {
            errs.add(ResolveError::UnknownAssociationKey {
                service: self.service.to_string(),
                entity: site.holder.to_string(),
                property: site.property.name.clone(),
                key: key.to_string(),
                on: on.to_string(),
            });
        }

        found
    }

    // Outer None: fatal. Inner None: unidirectional or counterpart not emitted.
    fn pair(
        &self,
        site: &Site<'_>,
        target: &QualifiedName,
        errs: &mut ErrorTree,
    ) -> Option<Option<PropertyRef>> {
        let info = site.info;
        let related = self
            .graph
            .entity(target.as_str())
            .into_iter()
            .chain(self.graph.ancestors(target.as_str()).unwrap_or_default())
            .chain(self.graph.descendants(target.as_str()));

        let mut candidates = Vec::new();
        for entity in related {
            for prop in &entity.properties {
                let same_site = &entity.name == site.declared_on && prop.name == site.property.name;
                if same_site {
                    continue;
                }
                if let Some(other) = &prop.association
                    && other.name == info.name
                {
                    candidates.push((entity, prop, other));
                }
            }
        }

        match candidates.as_slice() {
            [] => Some(None),
            [(entity, prop, other)] => {
                let partner = format!("{}.{}", entity.name, prop.name);

                let points_back = prop.ty.entity_name().is_some_and(|back| {
                    self.related(back, site.holder) || self.related(back, site.declared_on)
                });
                if !points_back {
                    errs.add(self.site_error(
                        site,
                        format!("counterpart '{partner}' has type {}", prop.ty),
                    ));
                    return None;
                }
                if prop.ty.is_collection() && site.property.ty.is_collection() {
                    errs.add(self.site_error(
                        site,
                        format!("many-to-many pairing with '{partner}' is not supported"),
                    ));
                    return None;
                }
                if other.is_foreign_key && info.is_foreign_key {
                    errs.add(self.site_error(
                        site,
                        format!("both this side and '{partner}' claim the foreign key"),
                    ));
                    return None;
                }
                if other.this_key != info.other_key || other.other_key != info.this_key {
                    errs.add(ResolveError::AssociationKeyMismatch {
                        service: self.service.to_string(),
                        entity: site.holder.to_string(),
                        property: site.property.name.clone(),
                        partner,
                    });
                    return None;
                }

                Some(
                    self.visible_holder(&entity.name, target)
                        .map(|holder| PropertyRef {
                            entity: holder,
                            property: prop.name.clone(),
                        }),
                )
            }
            many => {
                errs.add(ResolveError::AmbiguousAssociation {
                    service: self.service.to_string(),
                    entity: site.holder.to_string(),
                    property: site.property.name.clone(),
                    association: info.name.clone(),
                    candidates: many
                        .iter()
                        .map(|(e, p, _)| format!("{}.{}", e.name, p.name))
                        .collect(),
                });
                None
            }
        }
    }

    fn related(&self, a: &QualifiedName, b: &QualifiedName) -> bool {
        a == b
            || self.graph.derives_from(a.as_str(), b.as_str())
            || self.graph.derives_from(b.as_str(), a.as_str())
    }

    // The exposed entity that emits a member declared on `declared_on`,
    // approached from the associated entity `anchor`.
    fn visible_holder(
        &self,
        declared_on: &QualifiedName,
        anchor: &QualifiedName,
    ) -> Option<QualifiedName> {
        if self.exposure.has_entity(declared_on.as_str()) {
            return Some(declared_on.clone());
        }

        self.hierarchy
            .nodes
            .values()
            .filter(|n| n.lifted.iter().any(|l| &l.from == declared_on))
            .map(|n| &n.name)
            .find(|n| *n == anchor || self.related(n, anchor))
            .cloned()
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    fn resolve_projections(
        &self,
        mut pending: Vec<PendingProjection>,
        errs: &mut ErrorTree,
    ) -> BTreeMap<QualifiedName, Vec<Projection>> {
        let max = self.options.max_projection_depth;
        let mut resolved: BTreeMap<QualifiedName, Vec<Projection>> = BTreeMap::new();
        let mut order = 1;
        let mut depth_exceeded = false;

        while !pending.is_empty() {
            let snapshot = resolved.clone();
            let mut waiting = Vec::new();
            let mut progress = false;

            for item in pending {
                match self.projection_source(&snapshot, &item, order) {
                    SourceLookup::Found { ty, order: found } => {
                        if found > max {
                            depth_exceeded = true;
                            waiting.push(item);
                            continue;
                        }
                        progress = true;
                        resolved.entry(item.holder.clone()).or_default().push(Projection {
                            name: item.projected,
                            ty,
                            via: item.via,
                            source: item.source,
                            order: found,
                        });
                    }
                    SourceLookup::NotScalar(ty) => {
                        progress = true;
                        errs.add(ResolveError::ProjectionSourceNotScalar {
                            service: self.service.to_string(),
                            entity: item.holder.to_string(),
                            projected: item.projected,
                            source_field: item.source,
                            ty: ty.to_string(),
                        });
                    }
                    SourceLookup::Missing => waiting.push(item),
                }
            }

            pending = waiting;
            if !progress || depth_exceeded {
                break;
            }
            order += 1;
        }

        // whatever is left never reached a fixed point; report each root cause once
        let mut roots = BTreeMap::new();
        for index in 0..pending.len() {
            let (root, cause) = self.leftover_cause(&resolved, &pending, index);
            roots.entry(root).or_insert(cause);
        }
        for (root, cause) in roots {
            let item = &pending[root];
            let error = match cause {
                Leftover::DepthExceeded => ResolveError::ProjectionDepthExceeded {
                    service: self.service.to_string(),
                    entity: item.holder.to_string(),
                    projected: item.projected.clone(),
                    max,
                },
                Leftover::Cycle => ResolveError::ProjectionCycle {
                    service: self.service.to_string(),
                    entity: item.holder.to_string(),
                    projected: item.projected.clone(),
                    source_field: item.source.clone(),
                },
                Leftover::UnknownSource => ResolveError::UnknownProjectionSource {
                    service: self.service.to_string(),
                    entity: item.holder.to_string(),
                    projected: item.projected.clone(),
                    source_field: item.source.clone(),
                    target: item.target.to_string(),
                },
            };
            errs.add(error);
        }

        for projections in resolved.values_mut() {
            projections.sort_by(|a, b| (a.order, &a.name).cmp(&(b.order, &b.name)));
        }

        resolved
    }

    // Direct members are only eligible in the first round; projected members
    // only once an earlier round produced them.
    fn projection_source(
        &self,
        resolved: &BTreeMap<QualifiedName, Vec<Projection>>,
        item: &PendingProjection,
        order: usize,
    ) -> SourceLookup {
        if let Some((_, prop)) = self.graph.find_property(item.target.as_str(), &item.source) {
            if order > 1 && order != usize::MAX {
                return SourceLookup::Missing;
            }
            return match prop.ty.element() {
                TypeRef::Entity(_) => SourceLookup::NotScalar(prop.ty.clone()),
                _ if prop.ty.is_collection() => SourceLookup::NotScalar(prop.ty.clone()),
                _ => SourceLookup::Found {
                    ty: prop.ty.clone(),
                    order: 1,
                },
            };
        }

        self.hierarchy
            .visible_chain(item.target.as_str())
            .into_iter()
            .filter_map(|n| resolved.get(&n.name))
            .flatten()
            .find(|p| p.name == item.source)
            .map_or(SourceLookup::Missing, |p| SourceLookup::Found {
                ty: p.ty.clone(),
                order: p.order + 1,
            })
    }

    // Follow a leftover's dependencies through the other leftovers until the
    // chain ends (root cause) or revisits an item (cycle).
    fn leftover_cause(
        &self,
        resolved: &BTreeMap<QualifiedName, Vec<Projection>>,
        pending: &[PendingProjection],
        start: usize,
    ) -> (usize, Leftover) {
        let mut visited = BTreeSet::new();
        let mut current = start;

        loop {
            visited.insert(current);
            let item = &pending[current];

            // the source exists, so only the depth bound held it back
            if !matches!(
                self.projection_source(resolved, item, usize::MAX),
                SourceLookup::Missing
            ) {
                return (current, Leftover::DepthExceeded);
            }

            let chain: Vec<QualifiedName> = self
                .hierarchy
                .visible_chain(item.target.as_str())
                .into_iter()
                .map(|n| n.name.clone())
                .collect();
            let next = pending
                .iter()
                .position(|p| p.projected == item.source && chain.contains(&p.holder));

            match next {
                None => return (current, Leftover::UnknownSource),
                Some(next) if visited.contains(&next) => return (next, Leftover::Cycle),
                Some(next) => current = next,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Leftover {
    Cycle,
    DepthExceeded,
    UnknownSource,
}

enum SourceLookup {
    Found { ty: TypeRef, order: usize },
    NotScalar(TypeRef),
    Missing,
}

///
/// TESTS
///
