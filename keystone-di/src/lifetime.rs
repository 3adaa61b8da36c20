//! Lifetime tags and the reliability check between them

use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::fmt;

use crate::error::{DiError, DiResult};
use crate::service::TypeInfo;

/// How instances of an implementation may be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Built once and cached for the container lifetime
    #[default]
    Shared,
    /// Built for every request, never cached
    Transient,
}

impl Lifetime {
    pub fn is_transient(self) -> bool {
        matches!(self, Lifetime::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Shared => write!(f, "Shared"),
            Lifetime::Transient => write!(f, "Transient"),
        }
    }
}

/// Side table mapping implementation types to their lifetime tag.
///
/// Types without an entry are [`Lifetime::Shared`].
#[derive(Debug, Clone, Default)]
pub struct LifetimeTable {
    tags: FxHashMap<TypeId, Lifetime>,
}

impl LifetimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a type, replacing any previous tag
    pub fn mark(&mut self, type_info: TypeInfo, lifetime: Lifetime) {
        self.tags.insert(type_info.id(), lifetime);
    }

    pub fn lifetime_of(&self, type_id: TypeId) -> Lifetime {
        self.tags.get(&type_id).copied().unwrap_or_default()
    }

    pub fn is_transient(&self, type_id: TypeId) -> bool {
        self.lifetime_of(type_id).is_transient()
    }
}

/// Fails iff a shared `implementation` is being assembled from a transient
/// `dependency`. A shared object outlives every caller, so it must never
/// hold a value meant for a single use.
pub fn check_reliability(
    table: &LifetimeTable,
    contract: TypeInfo,
    implementation: TypeInfo,
    dependency: TypeInfo,
) -> DiResult<()> {
    if !table.is_transient(implementation.id()) && table.is_transient(dependency.id()) {
        return Err(DiError::LifetimeViolation {
            contract: contract.name().to_string(),
            implementation: implementation.name().to_string(),
            dependency: dependency.name().to_string(),
        });
    }
    Ok(())
}
