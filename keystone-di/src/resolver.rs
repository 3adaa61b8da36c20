//! Resolver variants held by the registry, one per contract

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::builder::ObjectBuilder;
use crate::catalog::Implementation;
use crate::container::Container;
use crate::decoration::{apply_decoration, Decoration};
use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;
use crate::service::{Component, TypeInfo};

/// Strategy producing the value of a contract
pub(crate) enum Resolver {
    /// Always the same value
    Instance(Component),
    /// Builds the implementation; shared implementations are built once
    Constructing(ConstructingResolver),
    /// Decorates every value of a transient inner resolver
    Decorating(DecoratingResolver),
}

pub(crate) struct ConstructingResolver {
    contract: TypeInfo,
    implementation: Arc<Implementation>,
    lifetime: Lifetime,
    cached: RwLock<Option<Component>>,
}

pub(crate) struct DecoratingResolver {
    contract: TypeInfo,
    inner: Arc<Resolver>,
    decoration: Decoration,
}

impl Resolver {
    pub fn instance(component: Component) -> Self {
        Resolver::Instance(component)
    }

    pub fn constructing(
        contract: TypeInfo,
        implementation: Arc<Implementation>,
        lifetime: Lifetime,
    ) -> Self {
        Resolver::Constructing(ConstructingResolver {
            contract,
            implementation,
            lifetime,
            cached: RwLock::new(None),
        })
    }

    pub fn decorating(contract: TypeInfo, inner: Arc<Resolver>, decoration: Decoration) -> Self {
        Resolver::Decorating(DecoratingResolver {
            contract,
            inner,
            decoration,
        })
    }

    pub fn lifetime(&self) -> Lifetime {
        match self {
            Resolver::Instance(_) => Lifetime::Shared,
            Resolver::Constructing(resolver) => resolver.lifetime,
            Resolver::Decorating(_) => Lifetime::Transient,
        }
    }

    pub fn resolve(&self, container: &Container, path: &mut ResolutionPath) -> DiResult<Component> {
        match self {
            Resolver::Instance(component) => Ok(component.clone()),
            Resolver::Constructing(resolver) => resolver.resolve(container, path),
            Resolver::Decorating(resolver) => {
                let inner = resolver.inner.resolve(container, path)?;
                apply_decoration(container, resolver.contract, &resolver.decoration, inner, path)
            }
        }
    }
}

impl ConstructingResolver {
    fn resolve(&self, container: &Container, path: &mut ResolutionPath) -> DiResult<Component> {
        let cached = self.cached.read().clone();
        if let Some(component) = cached {
            return Ok(component);
        }

        let component =
            ObjectBuilder::new(container).build(self.contract, &self.implementation, path)?;
        if self.lifetime.is_transient() {
            return Ok(component);
        }

        debug!(
            "Caching shared {} for {}",
            self.implementation.info(),
            self.contract
        );
        let mut cached = self.cached.write();
        Ok(cached.get_or_insert(component).clone())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Instance(component) => f.debug_tuple("Instance").field(component).finish(),
            Resolver::Constructing(resolver) => f
                .debug_struct("Constructing")
                .field("contract", &resolver.contract)
                .field("implementation", &resolver.implementation.info())
                .field("lifetime", &resolver.lifetime)
                .finish(),
            Resolver::Decorating(resolver) => f
                .debug_struct("Decorating")
                .field("contract", &resolver.contract)
                .field("inner", &resolver.inner)
                .finish(),
        }
    }
}

/// Contracts currently being resolved by one top-level call
#[derive(Debug, Default)]
pub(crate) struct ResolutionPath {
    stack: Vec<TypeInfo>,
}

impl ResolutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `contract`, failing if it is already being resolved
    pub fn enter(&mut self, contract: TypeInfo) -> DiResult<()> {
        if let Some(start) = self.stack.iter().position(|entry| *entry == contract) {
            let cycle = self.stack[start..]
                .iter()
                .chain(std::iter::once(&contract))
                .map(|entry| entry.short_name())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DiError::CircularDependency { path: cycle });
        }
        self.stack.push(contract);
        Ok(())
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    /// Run `resolve` with `contract` on the path
    pub fn within<T>(
        &mut self,
        contract: TypeInfo,
        resolve: impl FnOnce(&mut Self) -> DiResult<T>,
    ) -> DiResult<T> {
        self.enter(contract)?;
        let result = resolve(self);
        self.leave();
        result
    }
}
