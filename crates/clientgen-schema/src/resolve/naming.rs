use crate::{
    prelude::*,
    resolve::model::{ResolvedEntity, ResolvedService},
};
use std::collections::BTreeMap;

/// English plural of an entity short name, used for entity set members.
#[must_use]
pub fn pluralize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();

    if let Some(stem) = name.strip_suffix('y') {
        let before = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if before.is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{name}es");
    }

    format!("{name}s")
}

#[must_use]
pub fn entity_set_name(entity: &QualifiedName) -> String {
    pluralize(entity.short_name())
}

/// Context members: entity sets claim names first, then operations in
/// declaration order.
pub fn check_context_members(service: &ResolvedService, errs: &mut ErrorTree) {
    let mut claimed: BTreeMap<&str, String> = BTreeMap::new();

    let sets = service
        .entity_sets
        .iter()
        .map(|set| (set.name.as_str(), format!("entity set of '{}'", set.entity)));
    let ops = service
        .operations
        .iter()
        .filter_map(|op| op.member.as_deref().map(|m| (m, format!("operation '{}'", op.name))));

    for (member, owner) in sets.chain(ops) {
        if let Some(prev) = claimed.get(member) {
            errs.add(ResolveError::MemberCollision {
                service: service.name.to_string(),
                context: service.context.to_string(),
                owner: format!("{owner} (already claimed by {prev})"),
                member: member.to_string(),
            });
            continue;
        }
        claimed.insert(member, owner);
    }
}

/// Members of one emitted entity, inherited members included, must be unique
/// and must not shadow entity-bound methods.
pub fn check_entity_members(service: &str, entity: &ResolvedEntity, errs: &mut ErrorTree) {
    let mut claimed: BTreeMap<&str, &QualifiedName> = BTreeMap::new();

    for member in &entity.members {
        if claimed.insert(&member.name, &member.declared_on).is_some() {
            errs.add(ResolveError::MemberCollision {
                service: service.to_string(),
                context: entity.name.to_string(),
                owner: member.declared_on.to_string(),
                member: member.name.clone(),
            });
        }
    }
    for method in &entity.methods {
        if claimed.contains_key(method.as_str()) {
            errs.add(ResolveError::MemberCollision {
                service: service.to_string(),
                context: entity.name.to_string(),
                owner: entity.name.to_string(),
                member: method.clone(),
            });
        }
    }
}

/// Every emitted type name (context, entities, complex types) is unique.
pub fn check_type_names<'a>(
    service: &str,
    names: impl IntoIterator<Item = &'a QualifiedName>,
    errs: &mut ErrorTree,
) {
    let mut seen = BTreeMap::new();
    for name in names {
        let count = seen.entry(name).or_insert(0_usize);
        *count += 1;
        if *count == 2 {
            errs.add(ResolveError::TypeNameCollision {
                service: service.to_string(),
                name: name.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::model::{EntitySet, ResolvedOperation};

    #[test]
    fn pluralize_handles_common_endings() {
        assert_eq!(pluralize("Order"), "Orders");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Batch"), "Batches");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Day"), "Days");
    }

    fn service(ops: &[(&str, Option<&str>)]) -> ResolvedService {
        ResolvedService {
            name: "Shop.OrderService".into(),
            context: "Shop.OrderContext".into(),
            entity_sets: vec![EntitySet {
                name: "Orders".into(),
                entity: "Shop.Order".into(),
            }],
            operations: ops
                .iter()
                .map(|(name, member)| ResolvedOperation {
                    name: (*name).to_string(),
                    kind: OperationKind::Query,
                    member: member.map(str::to_string),
                    returns: None,
                    parameters: Vec::new(),
                    annotations: Vec::new(),
                })
                .collect(),
            entities: Vec::new(),
            complex_types: Vec::new(),
            annotations: Vec::new(),
        }
    }

    #[test]
    fn operation_colliding_with_entity_set_is_reported_once() {
        let svc = service(&[("Orders", Some("Orders")), ("GetTotal", Some("GetTotalQuery"))]);
        let mut errs = ErrorTree::new();
        check_context_members(&svc, &mut errs);

        assert_eq!(errs.len(), 1);
        let rendered = errs.to_string();
        assert!(rendered.contains("'Orders'"), "got: {rendered}");
        assert!(rendered.contains("Shop.OrderContext"), "got: {rendered}");
    }

    #[test]
    fn members_without_context_names_are_ignored() {
        let svc = service(&[("Insert", None), ("Insert", None)]);
        let mut errs = ErrorTree::new();
        check_context_members(&svc, &mut errs);

        assert!(errs.is_empty());
    }

    #[test]
    fn duplicate_type_names_are_reported_once() {
        let names: Vec<QualifiedName> = vec!["Shop.Order".into(), "Shop.Order".into(), "Shop.Order".into()];
        let mut errs = ErrorTree::new();
        check_type_names("Shop.OrderService", &names, &mut errs);

        assert_eq!(errs.len(), 1);
    }
}
