//! Core container implementation

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Implementation, TypeCatalog};
use crate::error::{DiError, DiResult};
use crate::provider::{Backup, CandidateSource, FnBackup, Source};
use crate::resolver::{ResolutionPath, Resolver};
use crate::service::{Component, Service, TypeInfo};

/// Dependency-resolution container.
///
/// Resolution consults, in order, the registry (explicit and previously
/// discovered entries), the sources (discovery over candidate types) and the
/// backups (fallbacks such as other containers). Registration methods return
/// `&mut Self` for chaining.
///
/// Registration and decoration are meant for one writer at a time; `get`
/// takes `&self` and may install newly discovered entries.
pub struct Container {
    catalog: Arc<TypeCatalog>,
    registry: RwLock<FxHashMap<TypeId, Arc<Resolver>>>,
    sources: Vec<Box<dyn Source>>,
    backups: Vec<Box<dyn Backup>>,
}

impl Container {
    /// Create a container with an empty catalog
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(TypeCatalog::default()))
    }

    /// Create a container that introspects implementations through `catalog`
    pub fn with_catalog(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            catalog,
            registry: RwLock::new(FxHashMap::default()),
            sources: Vec::new(),
            backups: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    /// Whether the registry holds an entry for `contract`
    pub fn contains(&self, contract: TypeInfo) -> bool {
        self.registry.read().contains_key(&contract.id())
    }

    /// Register a fixed instance of catalog implementation `I` as contract `C`
    pub fn add_instance<C, I>(&mut self, instance: Arc<I>) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Service,
    {
        let contract = TypeInfo::of::<C>();
        let implementation = self.implementation(TypeInfo::of::<I>())?;
        let component = implementation
            .present(instance, contract)
            .map_err(|_| DiError::invalid(contract, implementation.info()))?;
        self.install(contract, Resolver::instance(component));
        Ok(self)
    }

    /// Register a concrete value as its own contract `C`. Use
    /// [`Container::add_instance`] to register it under a trait contract.
    pub fn add_value<C>(&mut self, value: Arc<C>) -> &mut Self
    where
        C: Send + Sync + 'static,
    {
        let component = Component::from_value(value);
        self.install(component.contract(), Resolver::instance(component));
        self
    }

    /// Register a ready-made component for `contract`
    pub fn add_component(&mut self, contract: TypeInfo, component: Component) -> DiResult<&mut Self> {
        if component.contract() != contract {
            return Err(DiError::invalid(contract, component.concrete()));
        }
        self.install(contract, Resolver::instance(component));
        Ok(self)
    }

    /// Bind contract `C` to implementation `I`, built on first use
    pub fn add<C, I>(&mut self) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Service,
    {
        self.add_type(TypeInfo::of::<C>(), TypeInfo::of::<I>())
    }

    /// Bind `contract` to the catalog implementation `implementation`
    pub fn add_type(&mut self, contract: TypeInfo, implementation: TypeInfo) -> DiResult<&mut Self> {
        let implementation = self.implementation(implementation)?;
        if !implementation.implements(contract) {
            return Err(DiError::invalid(contract, implementation.info()));
        }
        let lifetime = self.catalog.lifetime_of(implementation.info().id());
        self.install(
            contract,
            Resolver::constructing(contract, implementation, lifetime),
        );
        Ok(self)
    }

    /// Discover implementations among `candidates`, in the given order
    pub fn refer<T>(&mut self, candidates: T) -> DiResult<&mut Self>
    where
        T: IntoIterator<Item = TypeInfo>,
    {
        let candidates = candidates
            .into_iter()
            .map(|candidate| self.implementation(candidate))
            .collect::<DiResult<Vec<_>>>()?;
        Ok(self.add_source(CandidateSource::new(candidates)))
    }

    /// Discover implementations among the members of a catalog module
    pub fn refer_module(&mut self, module: &str) -> &mut Self {
        let candidates = self.catalog.enumerate_candidates(module);
        debug!("Referring {} candidates from module {}", candidates.len(), module);
        self.add_source(CandidateSource::new(candidates))
    }

    /// Append a discovery source
    pub fn add_source(&mut self, source: impl Source + 'static) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Fall back to another container
    pub fn defer(&mut self, other: Arc<Container>) -> &mut Self {
        self.add_backup(other)
    }

    /// Fall back to a function returning a ready-made value
    pub fn defer_with<F>(&mut self, backup: F) -> &mut Self
    where
        F: Fn(TypeInfo) -> Option<Component> + Send + Sync + 'static,
    {
        self.add_backup(FnBackup(backup))
    }

    /// Append a fallback
    pub fn add_backup(&mut self, backup: impl Backup + 'static) -> &mut Self {
        self.backups.push(Box::new(backup));
        self
    }

    /// Resolve contract `C`
    pub fn get<C>(&self) -> DiResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.resolve(TypeInfo::of::<C>())?.typed::<C>()
    }

    /// Resolve contract `C`, returning `None` when nothing provides it
    pub fn get_maybe<C>(&self) -> DiResult<Option<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.resolve_maybe(TypeInfo::of::<C>())?
            .map(|component| component.typed::<C>())
            .transpose()
    }

    /// Resolve `contract` or fail with [`DiError::UnresolvedContract`]
    pub fn resolve(&self, contract: TypeInfo) -> DiResult<Component> {
        self.resolve_maybe(contract)?
            .ok_or_else(|| DiError::unresolved(contract))
    }

    /// Resolve `contract`; only "not found" turns into `None`
    pub fn resolve_maybe(&self, contract: TypeInfo) -> DiResult<Option<Component>> {
        let mut path = ResolutionPath::new();
        self.resolve_within(contract, &mut path)
    }

    /// Resolution step shared by top-level calls and constructor parameters
    pub(crate) fn resolve_within(
        &self,
        contract: TypeInfo,
        path: &mut ResolutionPath,
    ) -> DiResult<Option<Component>> {
        path.within(contract, |path| {
            if let Some(resolver) = self.entry(contract) {
                return resolver.resolve(self, path).map(Some);
            }
            if let Some(resolver) = self.discover(contract)? {
                return resolver.resolve(self, path).map(Some);
            }
            self.fall_back(contract)
        })
    }

    /// Registry entry for `contract`
    pub(crate) fn entry(&self, contract: TypeInfo) -> Option<Arc<Resolver>> {
        self.registry.read().get(&contract.id()).cloned()
    }

    /// Ask the sources for an implementation and persist the first match
    pub(crate) fn discover(&self, contract: TypeInfo) -> DiResult<Option<Arc<Resolver>>> {
        for source in &self.sources {
            let Some(implementation) = source.find(contract) else {
                continue;
            };
            if !implementation.implements(contract) || implementation.is_decorator_of(contract) {
                return Err(DiError::invalid(contract, implementation.info()));
            }

            let lifetime = self.catalog.lifetime_of(implementation.info().id());
            debug!(
                "Discovered {} ({}) for {}",
                implementation.info(),
                lifetime,
                contract
            );
            let resolver = Arc::new(Resolver::constructing(contract, implementation, lifetime));
            self.registry
                .write()
                .insert(contract.id(), resolver.clone());
            return Ok(Some(resolver));
        }
        Ok(None)
    }

    /// Ask the backups, in registration order
    pub(crate) fn fall_back(&self, contract: TypeInfo) -> DiResult<Option<Component>> {
        for backup in &self.backups {
            if let Some(component) = backup.lookup(contract)? {
                if component.contract() != contract {
                    return Err(DiError::invalid(contract, component.concrete()));
                }
                debug!("Backup provided {} for {}", component.concrete(), contract);
                return Ok(Some(component));
            }
        }
        Ok(None)
    }

    /// Replace the entry for `contract`
    pub(crate) fn install(&self, contract: TypeInfo, resolver: Resolver) {
        debug!("Registering {:?} for {}", resolver, contract);
        self.registry.write().insert(contract.id(), Arc::new(resolver));
    }

    pub(crate) fn implementation(&self, implementation: TypeInfo) -> DiResult<Arc<Implementation>> {
        self.catalog
            .introspect(implementation.id())
            .cloned()
            .ok_or_else(|| DiError::UnknownImplementation(implementation.name().to_string()))
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("entries", &self.registry.read().len())
            .field("sources", &self.sources.len())
            .field("backups", &self.backups.len())
            .finish()
    }
}
