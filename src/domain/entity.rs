//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone + 'static {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    NotFound(String),
    InvalidInput(String),
    /// Constraint violation reported by the storage engine
    Conflict(String),
    /// Any other storage engine failure (I/O, locking, bad SQL)
    Storage(String),
    /// Stored data could not be decoded into a domain value
    Decode(String),
    /// A payload carried a discriminator outside the known variant set
    UnknownVariant(String),
    Config(String),
    /// The owning scope was torn down before the result was delivered
    Cancelled,
    Internal(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Storage(msg) => write!(f, "Storage error: {}", msg),
            DomainError::Decode(msg) => write!(f, "Decode error: {}", msg),
            DomainError::UnknownVariant(tag) => write!(f, "Unknown payload variant: {}", tag),
            DomainError::Config(msg) => write!(f, "Config error: {}", msg),
            DomainError::Cancelled => write!(f, "Operation cancelled"),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Decode(e.to_string())
    }
}
