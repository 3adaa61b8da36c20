//! Object builder: constructor injection for catalog implementations

use tracing::trace;

use crate::catalog::Implementation;
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::lifetime::check_reliability;
use crate::resolver::ResolutionPath;
use crate::service::{Component, TypeInfo};

/// Builds implementations by resolving each constructor parameter through the
/// container that owns it
pub(crate) struct ObjectBuilder<'a> {
    container: &'a Container,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Build `implementation` and present it as `contract`
    pub fn build(
        &self,
        contract: TypeInfo,
        implementation: &Implementation,
        path: &mut ResolutionPath,
    ) -> DiResult<Component> {
        self.build_with(contract, implementation, None, path)
    }

    /// Like [`ObjectBuilder::build`], but parameters of `substitute`'s
    /// contract receive `substitute` instead of being resolved. This is how a
    /// decorator type is handed the value it wraps.
    pub fn build_with(
        &self,
        contract: TypeInfo,
        implementation: &Implementation,
        substitute: Option<&Component>,
        path: &mut ResolutionPath,
    ) -> DiResult<Component> {
        let constructor = implementation.constructor()?;
        let catalog = self.container.catalog();
        trace!(
            "Building {} for {} ({} parameters)",
            implementation.info(),
            contract,
            constructor.parameters().len()
        );

        let mut arguments = Vec::with_capacity(constructor.parameters().len());
        for &parameter in constructor.parameters() {
            let argument = match substitute {
                Some(inner) if inner.contract() == parameter => inner.clone(),
                _ => self
                    .container
                    .resolve_within(parameter, path)?
                    .ok_or_else(|| DiError::unresolved(parameter))?,
            };
            check_reliability(
                catalog.lifetimes(),
                contract,
                implementation.info(),
                argument.concrete(),
            )?;
            arguments.push(argument);
        }

        let instance = constructor.invoke(implementation.info(), arguments)?;
        implementation.present(instance, contract)
    }
}
