//! Error types for the DI container

use thiserror::Error;

/// Result type alias for DI operations
pub type DiResult<T> = Result<T, DiError>;

/// Errors that can occur while registering or resolving components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// No registry entry, source, or backup produced a value
    #[error("Unresolved contract: {contract}")]
    UnresolvedContract { contract: String },

    /// An explicitly registered instance or type does not satisfy the contract
    #[error("Invalid implementation: {implementation} does not implement {contract}")]
    InvalidImplementation {
        contract: String,
        implementation: String,
    },

    /// Implementation does not expose exactly one constructor
    #[error("{implementation} must expose exactly one constructor, found {count}")]
    AmbiguousConstructor { implementation: String, count: usize },

    /// A shared assembly captured a transient dependency
    #[error(
        "Lifetime violation: shared {implementation} (resolving {contract}) cannot capture transient {dependency}"
    )]
    LifetimeViolation {
        contract: String,
        implementation: String,
        dependency: String,
    },

    /// Circular dependency detected
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// Type is not described in the catalog
    #[error("Unknown implementation type: {0}")]
    UnknownImplementation(String),

    /// A component was presented under a contract it does not carry
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DiError {
    pub(crate) fn unresolved(contract: impl std::fmt::Display) -> Self {
        DiError::UnresolvedContract {
            contract: contract.to_string(),
        }
    }

    pub(crate) fn invalid(
        contract: impl std::fmt::Display,
        implementation: impl std::fmt::Display,
    ) -> Self {
        DiError::InvalidImplementation {
            contract: contract.to_string(),
            implementation: implementation.to_string(),
        }
    }
}
