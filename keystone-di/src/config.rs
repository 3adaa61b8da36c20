//! Configuration-based container setup
//!
//! Example configuration file format:
//!
//! ```toml
//! refer = ["storage"]
//!
//! [[bindings]]
//! contract = "Logger"
//! implementation = "ConsoleLogger"
//!
//! [lifetimes]
//! RequestContext = "transient"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::catalog::CatalogBuilder;
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;

/// Binding of a contract name to an implementation name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Contract type name (full or short)
    pub contract: String,
    /// Implementation type name (full or short)
    pub implementation: String,
}

/// Lifetime tag configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifetimeConfig {
    Shared,
    Transient,
}

impl From<LifetimeConfig> for Lifetime {
    fn from(config: LifetimeConfig) -> Self {
        match config {
            LifetimeConfig::Shared => Lifetime::Shared,
            LifetimeConfig::Transient => Lifetime::Transient,
        }
    }
}

/// Container configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Explicit contract bindings
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
    /// Catalog modules to discover implementations from, in order
    #[serde(default)]
    pub refer: Vec<String>,
    /// Lifetime overrides keyed by implementation name
    #[serde(default)]
    pub lifetimes: HashMap<String, LifetimeConfig>,
}

impl ContainerConfig {
    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> DiResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from JSON string
    pub fn from_json(json_str: &str) -> DiResult<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse JSON: {}", e)))
    }

    /// Apply lifetime overrides; call after registering implementations
    pub fn configure_catalog(&self, builder: &mut CatalogBuilder) -> DiResult<()> {
        for (name, lifetime) in &self.lifetimes {
            let type_info = builder
                .lookup(name)
                .ok_or_else(|| DiError::ConfigError(format!("Unknown implementation: {}", name)))?;
            builder.mark(type_info, (*lifetime).into());
        }
        Ok(())
    }

    /// Apply bindings and module referrals to a container
    pub fn apply(&self, container: &mut Container) -> DiResult<()> {
        for binding in &self.bindings {
            let catalog = container.catalog();
            let contract = catalog.contract_named(&binding.contract).ok_or_else(|| {
                DiError::ConfigError(format!("Unknown contract: {}", binding.contract))
            })?;
            let implementation = catalog
                .implementation_named(&binding.implementation)
                .map(|implementation| implementation.info())
                .ok_or_else(|| {
                    DiError::ConfigError(format!(
                        "Unknown implementation: {}",
                        binding.implementation
                    ))
                })?;
            debug!("Binding {} to {} from configuration", contract, implementation);
            container.add_type(contract, implementation)?;
        }

        for module in &self.refer {
            container.refer_module(module);
        }

        Ok(())
    }
}

/// Configuration builder
pub struct ConfigBuilder {
    config: ContainerConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
        }
    }

    /// Bind a contract name to an implementation name
    pub fn bind(&mut self, contract: &str, implementation: &str) -> &mut Self {
        self.config.bindings.push(BindingConfig {
            contract: contract.to_string(),
            implementation: implementation.to_string(),
        });
        self
    }

    /// Discover implementations from a catalog module
    pub fn refer(&mut self, module: &str) -> &mut Self {
        self.config.refer.push(module.to_string());
        self
    }

    /// Override an implementation's lifetime
    pub fn lifetime(&mut self, implementation: &str, lifetime: LifetimeConfig) -> &mut Self {
        self.config
            .lifetimes
            .insert(implementation.to_string(), lifetime);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ContainerConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
