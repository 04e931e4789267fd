use crate::{prelude::*, resolve::hierarchy::known_subtype_closure};
use std::collections::{BTreeSet, VecDeque};

///
/// Exposure
///
/// Types a single service makes visible to the client.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Exposure {
    pub entities: BTreeSet<QualifiedName>,
    pub complex_types: BTreeSet<QualifiedName>,
}

impl Exposure {
    #[must_use]
    pub fn has_entity(&self, name: &str) -> bool {
        self.entities.contains(name)
    }
}

enum Pending {
    Entity(QualifiedName, String),
    Complex(QualifiedName, String),
}

/// Walk everything reachable from a service: listed entities, operation
/// signatures, association and complex-type members (including those on
/// non-exposed ancestors), and declared known subtypes.
pub fn compute_exposure(
    graph: &MetadataGraph,
    service: &ServiceDescriptor,
    errs: &mut ErrorTree,
) -> Exposure {
    let service_name = service.name.to_string();
    let mut exposure = Exposure::default();
    let mut queue = VecDeque::new();

    for entity in &service.entities {
        queue.push_back(Pending::Entity(entity.clone(), service_name.clone()));
    }
    for op in &service.operations {
        let from = format!("{service_name}.{}", op.name);
        for ty in op.signature_types() {
            enqueue_type(ty, &from, &mut queue);
        }
    }

    while let Some(next) = queue.pop_front() {
        match next {
            Pending::Entity(name, from) => {
                if exposure.entities.contains(&name) {
                    continue;
                }
                let Some(entity) = graph.entity(name.as_str()) else {
                    errs.add(ResolveError::UnknownType {
                        service: service_name.clone(),
                        name: name.to_string(),
                        referenced_from: from,
                    });
                    continue;
                };
                exposure.entities.insert(name.clone());

                let chain = std::iter::once(entity).chain(graph.ancestors(name.as_str()).unwrap_or_default());
                for declaring in chain {
                    for prop in &declaring.properties {
                        let from = format!("{}.{}", declaring.name, prop.name);
                        enqueue_type(&prop.ty, &from, &mut queue);
                    }
                }
                // subtypes declared on any ancestor count when they derive from here
                let inherited = known_subtype_closure(graph, name.as_str())
                    .into_iter()
                    .filter(|s| graph.derives_from(s.as_str(), name.as_str()));
                for subtype in entity.known_subtypes.iter().cloned().chain(inherited) {
                    queue.push_back(Pending::Entity(subtype, name.to_string()));
                }
            }
            Pending::Complex(name, from) => {
                if exposure.complex_types.contains(&name) {
                    continue;
                }
                let Some(complex) = graph.complex(name.as_str()) else {
                    errs.add(ResolveError::UnknownType {
                        service: service_name.clone(),
                        name: name.to_string(),
                        referenced_from: from,
                    });
                    continue;
                };
                exposure.complex_types.insert(name.clone());

                for prop in &complex.properties {
                    if let Some(entity) = prop.ty.entity_name() {
                        errs.add(ResolveError::ComplexTypeReferencesEntity {
                            service: service_name.clone(),
                            complex: name.to_string(),
                            property: prop.name.clone(),
                            entity: entity.to_string(),
                        });
                        continue;
                    }
                    let from = format!("{name}.{}", prop.name);
                    enqueue_type(&prop.ty, &from, &mut queue);
                }
            }
        }
    }

    exposure
}

fn enqueue_type(ty: &TypeRef, from: &str, queue: &mut VecDeque<Pending>) {
    match ty.element() {
        TypeRef::Entity(name) => queue.push_back(Pending::Entity(name.clone(), from.to_string())),
        TypeRef::Complex(name) => queue.push_back(Pending::Complex(name.clone(), from.to_string())),
        TypeRef::Scalar(_) | TypeRef::Collection(_) => {}
    }
}
