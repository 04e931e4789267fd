use std::fmt;
use thiserror::Error as ThisError;

///
/// ResolveError
///
/// One structural problem found while resolving a service. Every variant is
/// fatal for the service it names; nothing is emitted for that service.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum ResolveError {
    #[error(
        "association '{association}' on '{entity}.{property}' in service '{service}' has more than one counterpart: {}",
        .candidates.join(", ")
    )]
    AmbiguousAssociation {
        service: String,
        entity: String,
        property: String,
        association: String,
        candidates: Vec<String>,
    },

    #[error(
        "association on '{entity}.{property}' in service '{service}' declares {this_count} this-side key(s) and {other_count} other-side key(s)"
    )]
    AssociationKeyCount {
        service: String,
        entity: String,
        property: String,
        this_count: usize,
        other_count: usize,
    },

    #[error(
        "association on '{entity}.{property}' in service '{service}' does not mirror the keys of its counterpart '{partner}'"
    )]
    AssociationKeyMismatch {
        service: String,
        entity: String,
        property: String,
        partner: String,
    },

    #[error(
        "association on '{entity}.{property}' in service '{service}' pairs key '{this_key}' ({this_ty}) with '{other_key}' ({other_ty})"
    )]
    AssociationKeyType {
        service: String,
        entity: String,
        property: String,
        this_key: String,
        this_ty: String,
        other_key: String,
        other_ty: String,
    },

    #[error("association on '{entity}.{property}' in service '{service}' is invalid: {reason}")]
    AssociationTypeIncompatible {
        service: String,
        entity: String,
        property: String,
        reason: String,
    },

    #[error(
        "complex type '{complex}' in service '{service}' references entity type '{entity}' through property '{property}'"
    )]
    ComplexTypeReferencesEntity {
        service: String,
        complex: String,
        property: String,
        entity: String,
    },

    #[error("entity '{entity}' in service '{service}' is part of an inheritance cycle")]
    InheritanceCycle { service: String, entity: String },

    #[error(
        "entity '{entity}' in service '{service}' declares known subtype '{subtype}', which does not derive from it"
    )]
    InvalidKnownSubtype {
        service: String,
        entity: String,
        subtype: String,
    },

    #[error(
        "entity '{entity}' in service '{service}' declares key field(s) {} but is not the root of its hierarchy",
        .fields.join(", ")
    )]
    KeyOnNonRoot {
        service: String,
        entity: String,
        fields: Vec<String>,
    },

    #[error(
        "member '{member}' on '{owner}' collides with another member of the same name (context '{context}', service '{service}')"
    )]
    MemberCollision {
        service: String,
        context: String,
        owner: String,
        member: String,
    },

    #[error("entity '{entity}' in service '{service}' is a hierarchy root but declares no key field")]
    MissingKey { service: String, entity: String },

    #[error(
        "entity '{entity}' in service '{service}' is not declared as a known subtype reachable from its root '{root}'"
    )]
    NotKnownSubtype {
        service: String,
        entity: String,
        root: String,
    },

    #[error(
        "projected member '{entity}.{projected}' in service '{service}' cannot be resolved: source '{source_field}' is part of a projection cycle"
    )]
    ProjectionCycle {
        service: String,
        entity: String,
        projected: String,
        source_field: String,
    },

    #[error(
        "projected member '{entity}.{projected}' in service '{service}' exceeds the maximum projection depth of {max}"
    )]
    ProjectionDepthExceeded {
        service: String,
        entity: String,
        projected: String,
        max: usize,
    },

    #[error(
        "projected member '{entity}.{projected}' in service '{service}' is sourced from '{source_field}' of type {ty}, which is not a scalar or complex value"
    )]
    ProjectionSourceNotScalar {
        service: String,
        entity: String,
        projected: String,
        source_field: String,
        ty: String,
    },

    #[error(
        "property '{entity}.{property}' in service '{service}' carries association annotation '{annotation}' directly, which is not allowed"
    )]
    RawAssociationAnnotation {
        service: String,
        entity: String,
        property: String,
        annotation: String,
    },

    #[error("emitted type name '{name}' in service '{service}' is already used by another type")]
    TypeNameCollision { service: String, name: String },

    #[error(
        "association on '{entity}.{property}' in service '{service}' names key '{key}', which does not exist on '{on}'"
    )]
    UnknownAssociationKey {
        service: String,
        entity: String,
        property: String,
        key: String,
        on: String,
    },

    #[error(
        "projected member '{entity}.{projected}' in service '{service}' names source '{source_field}', which does not exist on '{target}'"
    )]
    UnknownProjectionSource {
        service: String,
        entity: String,
        projected: String,
        source_field: String,
        target: String,
    },

    #[error("type '{name}' referenced from '{referenced_from}' in service '{service}' is not in the metadata graph")]
    UnknownType {
        service: String,
        name: String,
        referenced_from: String,
    },
}

impl ResolveError {
    /// Stable diagnostic code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingKey { .. } => "CG1001",
            Self::KeyOnNonRoot { .. } => "CG1002",
            Self::NotKnownSubtype { .. } => "CG1003",
            Self::InvalidKnownSubtype { .. } => "CG1004",
            Self::InheritanceCycle { .. } => "CG1005",
            Self::UnknownType { .. } => "CG1006",
            Self::ComplexTypeReferencesEntity { .. } => "CG1007",
            Self::AssociationKeyCount { .. } => "CG1101",
            Self::AssociationKeyType { .. } => "CG1102",
            Self::AssociationKeyMismatch { .. } => "CG1103",
            Self::AssociationTypeIncompatible { .. } => "CG1104",
            Self::AmbiguousAssociation { .. } => "CG1105",
            Self::UnknownAssociationKey { .. } => "CG1106",
            Self::RawAssociationAnnotation { .. } => "CG1107",
            Self::UnknownProjectionSource { .. } => "CG1201",
            Self::ProjectionCycle { .. } => "CG1202",
            Self::ProjectionDepthExceeded { .. } => "CG1203",
            Self::ProjectionSourceNotScalar { .. } => "CG1204",
            Self::MemberCollision { .. } => "CG1301",
            Self::TypeNameCollision { .. } => "CG1302",
        }
    }

    /// Name of the service this error aborts.
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::AmbiguousAssociation { service, .. }
            | Self::AssociationKeyCount { service, .. }
            | Self::AssociationKeyMismatch { service, .. }
            | Self::AssociationKeyType { service, .. }
            | Self::AssociationTypeIncompatible { service, .. }
            | Self::ComplexTypeReferencesEntity { service, .. }
            | Self::InheritanceCycle { service, .. }
            | Self::InvalidKnownSubtype { service, .. }
            | Self::KeyOnNonRoot { service, .. }
            | Self::MemberCollision { service, .. }
            | Self::MissingKey { service, .. }
            | Self::NotKnownSubtype { service, .. }
            | Self::ProjectionCycle { service, .. }
            | Self::ProjectionDepthExceeded { service, .. }
            | Self::ProjectionSourceNotScalar { service, .. }
            | Self::RawAssociationAnnotation { service, .. }
            | Self::TypeNameCollision { service, .. }
            | Self::UnknownAssociationKey { service, .. }
            | Self::UnknownProjectionSource { service, .. }
            | Self::UnknownType { service, .. } => service,
        }
    }
}

///
/// ErrorTree
///
/// Collects every fatal issue found for one service so a single pass
/// reports all of them instead of stopping at the first.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    errors: Vec<ResolveError>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ResolveError) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolveError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was collected, otherwise the tree itself.
    pub fn result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorTree {}

impl IntoIterator for ErrorTree {
    type Item = ResolveError;
    type IntoIter = std::vec::IntoIter<ResolveError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
