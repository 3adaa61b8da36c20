//! Dependency resolution container for Keystone
//!
//! The container builds object graphs on demand. Given a contract type
//! (usually `dyn Trait`), it returns a value satisfying it, constructing any
//! transitive dependencies through the constructors described in a
//! [`TypeCatalog`].
//!
//! Values come from explicit registrations, from discovery over candidate
//! implementation types, or from fallback backups such as other containers.
//! Implementations are either shared (built once and cached) or transient
//! (built per request), and a shared object may never capture a transient one.

mod builder;
pub mod catalog;
pub mod container;
mod decoration;
pub mod error;
pub mod lifetime;
pub mod provider;
mod resolver;
pub mod service;

#[cfg(feature = "config")]
pub mod config;

pub use catalog::{
    Arguments, CatalogBuilder, Constructor, Factory, Implementation, ImplementationBuilder,
    TypeCatalog,
};
pub use container::Container;
pub use error::{DiError, DiResult};
pub use lifetime::{check_reliability, Lifetime, LifetimeTable};
pub use provider::{Backup, CandidateSource, FnBackup, FnSource, Source};
pub use service::{Component, Service, TypeInfo};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        CatalogBuilder, Component, Container, DiError, DiResult, Implementation, Lifetime,
        Service, TypeCatalog, TypeInfo,
    };

    #[cfg(feature = "config")]
    pub use crate::config::{ConfigBuilder, ContainerConfig};
}
