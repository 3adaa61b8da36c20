//! Discovery sources and fallback backups consulted after the registry

use std::sync::Arc;
use tracing::trace;

use crate::catalog::Implementation;
use crate::container::Container;
use crate::error::DiResult;
use crate::service::{Component, TypeInfo};

/// Maps a requested contract to a candidate implementation type
pub trait Source: Send + Sync {
    fn find(&self, contract: TypeInfo) -> Option<Arc<Implementation>>;
}

/// Produces a ready-made value when registry and sources came up empty.
///
/// `Ok(None)` means "try the next backup".
pub trait Backup: Send + Sync {
    fn lookup(&self, contract: TypeInfo) -> DiResult<Option<Component>>;
}

/// Source over a fixed candidate list, matched in list order
#[derive(Debug, Clone, Default)]
pub struct CandidateSource {
    candidates: Vec<Arc<Implementation>>,
}

impl CandidateSource {
    pub fn new(candidates: Vec<Arc<Implementation>>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Arc<Implementation>] {
        &self.candidates
    }
}

impl Source for CandidateSource {
    fn find(&self, contract: TypeInfo) -> Option<Arc<Implementation>> {
        // a decorator of the contract is never its primary implementation
        let found = self
            .candidates
            .iter()
            .find(|candidate| {
                candidate.implements(contract) && !candidate.is_decorator_of(contract)
            })
            .cloned();
        if let Some(candidate) = &found {
            trace!("Candidate {} matches {}", candidate.info(), contract);
        }
        found
    }
}

/// Source backed by a closure
pub struct FnSource<F>(pub F);

impl<F> Source for FnSource<F>
where
    F: Fn(TypeInfo) -> Option<Arc<Implementation>> + Send + Sync,
{
    fn find(&self, contract: TypeInfo) -> Option<Arc<Implementation>> {
        (self.0)(contract)
    }
}

/// Backup backed by a closure; closures cannot fail, only miss
pub struct FnBackup<F>(pub F);

impl<F> Backup for FnBackup<F>
where
    F: Fn(TypeInfo) -> Option<Component> + Send + Sync,
{
    fn lookup(&self, contract: TypeInfo) -> DiResult<Option<Component>> {
        Ok((self.0)(contract))
    }
}

/// Another container acting as a fallback. Only "not found" becomes a miss;
/// its other failures surface to the caller.
impl Backup for Arc<Container> {
    fn lookup(&self, contract: TypeInfo) -> DiResult<Option<Component>> {
        self.resolve_maybe(contract)
    }
}
