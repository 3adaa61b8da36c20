//! Decoration engine
//!
//! Decorating a shared contract runs the decoration once, immediately, and
//! replaces the entry with the decorated value. Decorating a transient
//! contract wraps its resolver so every resolution decorates a fresh base
//! value. Repeated decorations compose in registration order.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::builder::ObjectBuilder;
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::lifetime::check_reliability;
use crate::resolver::{ResolutionPath, Resolver};
use crate::service::{Component, Service, TypeInfo};

/// Turns the current value of a contract into its decorated value
pub(crate) type Decoration =
    Arc<dyn Fn(&Container, Component, &mut ResolutionPath) -> DiResult<Component> + Send + Sync>;

/// Run `decoration` on `inner` and check the result may hold it
pub(crate) fn apply_decoration(
    container: &Container,
    contract: TypeInfo,
    decoration: &Decoration,
    inner: Component,
    path: &mut ResolutionPath,
) -> DiResult<Component> {
    let inner_type = inner.concrete();
    let outer = decoration(container, inner, path)?;
    check_reliability(
        container.catalog().lifetimes(),
        contract,
        outer.concrete(),
        inner_type,
    )?;
    trace!("Decorated {} with {} for {}", inner_type, outer.concrete(), contract);
    Ok(outer)
}

impl Container {
    /// Decorate contract `C` with decorator type `D`. `D`'s constructor takes
    /// the current value of `C`; its other parameters are resolved normally.
    ///
    /// Without a registry entry, `C` is first looked up through the sources.
    /// A discovered transient implementation is then decorated on every
    /// resolution, not once into a fixed instance. Values from backups are
    /// decorated once and installed as a fixed instance.
    pub fn decorate<C, D>(&mut self) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
        D: Service,
    {
        self.decorate_type(TypeInfo::of::<C>(), TypeInfo::of::<D>())
    }

    /// Untyped form of [`Container::decorate`]
    pub fn decorate_type(&mut self, contract: TypeInfo, decorator: TypeInfo) -> DiResult<&mut Self> {
        let implementation = self.implementation(decorator)?;
        if !implementation.implements(contract) {
            return Err(DiError::invalid(contract, implementation.info()));
        }

        let decoration: Decoration = Arc::new(
            move |container: &Container, inner: Component, path: &mut ResolutionPath| {
                ObjectBuilder::new(container).build_with(
                    contract,
                    &implementation,
                    Some(&inner),
                    path,
                )
            },
        );
        self.install_decoration(contract, decoration)
    }

    /// Decorate contract `C` with a function producing catalog implementation `D`
    pub fn decorate_with<C, D>(
        &mut self,
        decorate: impl Fn(Arc<C>) -> D + Send + Sync + 'static,
    ) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
        D: Service,
    {
        let contract = TypeInfo::of::<C>();
        let implementation = self.implementation(TypeInfo::of::<D>())?;
        if !implementation.implements(contract) {
            return Err(DiError::invalid(contract, implementation.info()));
        }

        let decoration: Decoration = Arc::new(
            move |_: &Container, inner: Component, _: &mut ResolutionPath| {
                let outer = decorate(inner.typed::<C>()?);
                implementation.present(Arc::new(outer), contract)
            },
        );
        self.install_decoration(contract, decoration)
    }

    fn install_decoration(&mut self, contract: TypeInfo, decoration: Decoration) -> DiResult<&mut Self> {
        let existing = match self.entry(contract) {
            Some(resolver) => Some(resolver),
            None => self.discover(contract)?,
        };

        let this: &Container = self;
        let mut path = ResolutionPath::new();
        let resolver = match existing {
            Some(inner) if inner.lifetime().is_transient() => {
                debug!("Decorating transient {} on every resolution", contract);
                Resolver::decorating(contract, inner, decoration)
            }
            Some(inner) => {
                let outer = path.within(contract, |path| {
                    let value = inner.resolve(this, path)?;
                    apply_decoration(this, contract, &decoration, value, path)
                })?;
                Resolver::instance(outer)
            }
            None => {
                let outer = path.within(contract, |path| {
                    let value = this
                        .fall_back(contract)?
                        .ok_or_else(|| DiError::unresolved(contract))?;
                    apply_decoration(this, contract, &decoration, value, path)
                })?;
                Resolver::instance(outer)
            }
        };

        self.install(contract, resolver);
        Ok(self)
    }
}
