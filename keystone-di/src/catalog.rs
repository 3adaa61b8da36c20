//! Type catalog: constructors, provided contracts and lifetime tags of
//! implementation types.
//!
//! Rust has no runtime reflection, so every implementation the container can
//! build is described up front by an [`Implementation`] descriptor and
//! collected into a [`TypeCatalog`]. The container only ever asks the catalog
//! two things: which candidates a module holds, and how to construct and
//! present a given implementation.

use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::lifetime::{Lifetime, LifetimeTable};
use crate::service::{Component, Service, TypeInfo};

type Invoke = Arc<dyn Fn(&mut Arguments) -> DiResult<Arc<dyn Service>> + Send + Sync>;
type Upcast = Arc<dyn Fn(Arc<dyn Service>) -> Option<Component> + Send + Sync>;

/// Resolved constructor arguments, consumed in declaration order
pub struct Arguments {
    owner: TypeInfo,
    components: std::vec::IntoIter<Component>,
}

impl Arguments {
    pub(crate) fn new(owner: TypeInfo, components: Vec<Component>) -> Self {
        Self {
            owner,
            components: components.into_iter(),
        }
    }

    /// Take the next argument as contract `C`
    pub fn next<C>(&mut self) -> DiResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        match self.components.next() {
            Some(component) => component.typed::<C>(),
            None => Err(DiError::TypeMismatch {
                expected: std::any::type_name::<C>().to_string(),
                found: format!("end of arguments for {}", self.owner),
            }),
        }
    }
}

/// A constructor function whose parameters are contract handles (`Arc<C>`).
///
/// Implemented for `Fn(Arc<A>, Arc<B>, ...) -> I` closures and function items
/// with up to eight parameters.
pub trait Factory<Args, I>: Send + Sync + 'static {
    /// Contract types of the parameters, in declaration order
    fn parameters() -> Vec<TypeInfo>;

    /// Invoke with already resolved arguments
    fn call(&self, arguments: &mut Arguments) -> DiResult<I>;
}

macro_rules! impl_factory {
    ($($param:ident),*) => {
        impl<F, I, $($param,)*> Factory<($(Arc<$param>,)*), I> for F
        where
            F: Fn($(Arc<$param>),*) -> I + Send + Sync + 'static,
            $($param: ?Sized + Send + Sync + 'static,)*
        {
            fn parameters() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$param>()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, arguments: &mut Arguments) -> DiResult<I> {
                $(let $param = arguments.next::<$param>()?;)*
                Ok((self)($($param),*))
            }
        }
    };
}

impl_factory!();
impl_factory!(A1);
impl_factory!(A1, A2);
impl_factory!(A1, A2, A3);
impl_factory!(A1, A2, A3, A4);
impl_factory!(A1, A2, A3, A4, A5);
impl_factory!(A1, A2, A3, A4, A5, A6);
impl_factory!(A1, A2, A3, A4, A5, A6, A7);
impl_factory!(A1, A2, A3, A4, A5, A6, A7, A8);

/// One public constructor of an implementation
#[derive(Clone)]
pub struct Constructor {
    parameters: Vec<TypeInfo>,
    invoke: Invoke,
}

impl Constructor {
    pub fn new<I, Args, F>(factory: F) -> Self
    where
        I: Service,
        F: Factory<Args, I>,
    {
        let parameters = F::parameters();
        let invoke: Invoke = Arc::new(move |arguments: &mut Arguments| {
            factory
                .call(arguments)
                .map(|instance| Arc::new(instance) as Arc<dyn Service>)
        });
        Self { parameters, invoke }
    }

    pub fn parameters(&self) -> &[TypeInfo] {
        &self.parameters
    }

    pub(crate) fn invoke(
        &self,
        owner: TypeInfo,
        arguments: Vec<Component>,
    ) -> DiResult<Arc<dyn Service>> {
        let mut arguments = Arguments::new(owner, arguments);
        (self.invoke)(&mut arguments)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Describes one implementation type: its lifetime, its constructors and the
/// contracts it can be presented as.
pub struct Implementation {
    info: TypeInfo,
    lifetime: Lifetime,
    constructors: Vec<Constructor>,
    provides: FxHashMap<TypeId, (TypeInfo, Upcast)>,
}

impl Implementation {
    /// Start describing implementation `I`; it always provides itself
    pub fn of<I: Service>() -> ImplementationBuilder<I> {
        ImplementationBuilder::new()
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    /// Declared lifetime; the catalog's lifetime table may override it
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Contracts this implementation can be presented as
    pub fn contracts(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.provides.values().map(|(contract, _)| *contract)
    }

    pub fn implements(&self, contract: TypeInfo) -> bool {
        self.provides.contains_key(&contract.id())
    }

    /// A type decorates `contract` when one of its constructors takes it
    pub fn is_decorator_of(&self, contract: TypeInfo) -> bool {
        self.constructors
            .iter()
            .any(|constructor| constructor.parameters().contains(&contract))
    }

    /// The single public constructor
    pub fn constructor(&self) -> DiResult<&Constructor> {
        match self.constructors.as_slice() {
            [constructor] => Ok(constructor),
            other => Err(DiError::AmbiguousConstructor {
                implementation: self.info.name().to_string(),
                count: other.len(),
            }),
        }
    }

    /// Present a constructed instance as `contract`
    pub fn present(&self, instance: Arc<dyn Service>, contract: TypeInfo) -> DiResult<Component> {
        let (_, upcast) = self
            .provides
            .get(&contract.id())
            .ok_or_else(|| DiError::invalid(contract, self.info))?;
        let found = Service::type_name(&*instance);
        upcast(instance).ok_or_else(|| DiError::TypeMismatch {
            expected: self.info.name().to_string(),
            found: found.to_string(),
        })
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("type", &self.info.name())
            .field("lifetime", &self.lifetime)
            .field("constructors", &self.constructors.len())
            .field(
                "provides",
                &self.contracts().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Fluent builder for [`Implementation`]
pub struct ImplementationBuilder<I> {
    info: TypeInfo,
    lifetime: Lifetime,
    constructors: Vec<Constructor>,
    provides: FxHashMap<TypeId, (TypeInfo, Upcast)>,
    _marker: PhantomData<fn() -> I>,
}

impl<I: Service> ImplementationBuilder<I> {
    fn new() -> Self {
        let builder = Self {
            info: TypeInfo::of::<I>(),
            lifetime: Lifetime::Shared,
            constructors: Vec::new(),
            provides: FxHashMap::default(),
            _marker: PhantomData,
        };
        builder.provides::<I>(|it| it)
    }

    /// Declare that `I` implements contract `C`; `coerce` is usually `|it| it`
    pub fn provides<C>(mut self, coerce: impl Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let concrete = self.info;
        let upcast: Upcast = Arc::new(move |instance: Arc<dyn Service>| {
            instance
                .downcast_arc::<I>()
                .ok()
                .map(|it| Component::new(coerce(it), concrete))
        });
        self.provides
            .insert(TypeId::of::<C>(), (TypeInfo::of::<C>(), upcast));
        self
    }

    /// Add a public constructor
    pub fn constructor<Args>(mut self, factory: impl Factory<Args, I>) -> Self {
        self.constructors.push(Constructor::new(factory));
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Mark instances as single-use
    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    pub fn build(self) -> Implementation {
        Implementation {
            info: self.info,
            lifetime: self.lifetime,
            constructors: self.constructors,
            provides: self.provides,
        }
    }
}

/// Everything the container may introspect, plus the lifetime side table
#[derive(Default)]
pub struct TypeCatalog {
    implementations: FxHashMap<TypeId, Arc<Implementation>>,
    order: Vec<TypeId>,
    names: FxHashMap<String, TypeId>,
    contracts: FxHashMap<String, TypeInfo>,
    modules: FxHashMap<String, Vec<TypeId>>,
    lifetimes: LifetimeTable,
}

impl TypeCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Constructors and contracts of an implementation type
    pub fn introspect(&self, implementation: TypeId) -> Option<&Arc<Implementation>> {
        self.implementations.get(&implementation)
    }

    /// Implementations registered in `module`, in registration order
    pub fn enumerate_candidates(&self, module: &str) -> Vec<Arc<Implementation>> {
        self.modules
            .get(module)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.implementations.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All implementations, in registration order
    pub fn implementations(&self) -> impl Iterator<Item = &Arc<Implementation>> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.implementations.get(id))
    }

    /// Look up an implementation by full or short type name
    pub fn implementation_named(&self, name: &str) -> Option<&Arc<Implementation>> {
        self.names
            .get(name)
            .and_then(|id| self.implementations.get(id))
    }

    /// Look up a contract provided by some implementation, by full or short name
    pub fn contract_named(&self, name: &str) -> Option<TypeInfo> {
        self.contracts.get(name).copied()
    }

    pub fn lifetimes(&self) -> &LifetimeTable {
        &self.lifetimes
    }

    pub fn lifetime_of(&self, type_id: TypeId) -> Lifetime {
        self.lifetimes.lifetime_of(type_id)
    }

    pub fn is_transient(&self, type_id: TypeId) -> bool {
        self.lifetimes.is_transient(type_id)
    }

    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("implementations", &self.order.len())
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for constructing a [`TypeCatalog`]
pub struct CatalogBuilder {
    catalog: TypeCatalog,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            catalog: TypeCatalog::default(),
        }
    }

    /// Register an implementation outside of any module
    pub fn register(&mut self, implementation: Implementation) -> &mut Self {
        self.insert(None, implementation);
        self
    }

    /// Register an implementation as a member of `module`
    pub fn register_in(&mut self, module: &str, implementation: Implementation) -> &mut Self {
        self.insert(Some(module), implementation);
        self
    }

    /// Tag a type's lifetime, overriding what its descriptor declared
    pub fn mark(&mut self, type_info: TypeInfo, lifetime: Lifetime) -> &mut Self {
        self.catalog.lifetimes.mark(type_info, lifetime);
        self
    }

    /// Implementation registered so far under `name`
    pub fn lookup(&self, name: &str) -> Option<TypeInfo> {
        self.catalog
            .implementation_named(name)
            .map(|implementation| implementation.info())
    }

    pub fn build(self) -> TypeCatalog {
        self.catalog
    }

    fn insert(&mut self, module: Option<&str>, implementation: Implementation) {
        let catalog = &mut self.catalog;
        let info = implementation.info();

        catalog.lifetimes.mark(info, implementation.lifetime());
        catalog.names.insert(info.name().to_string(), info.id());
        catalog.names.insert(info.short_name().to_string(), info.id());
        for contract in implementation.contracts() {
            catalog.contracts.insert(contract.name().to_string(), contract);
            catalog
                .contracts
                .insert(contract.short_name().to_string(), contract);
        }

        if !catalog.order.contains(&info.id()) {
            catalog.order.push(info.id());
        }
        if let Some(module) = module {
            let members = catalog.modules.entry(module.to_string()).or_default();
            if !members.contains(&info.id()) {
                members.push(info.id());
            }
        }

        catalog
            .implementations
            .insert(info.id(), Arc::new(implementation));
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}
