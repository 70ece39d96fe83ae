//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Implementations can use SQLite, in-memory, etc.

use async_trait::async_trait;

use crate::domain::{DomainResult, Entity};
use crate::persistence::LiveQuery;

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Insert or replace an entity, returning its id
    async fn insert(&self, entity: &T) -> DomainResult<T::Id>;

    /// Insert or replace many entities as one unit
    async fn insert_all(&self, entities: &[T]) -> DomainResult<Vec<T::Id>>;

    /// Update an existing entity, returning the number of rows changed
    async fn update(&self, entity: &T) -> DomainResult<usize>;

    /// Delete entity by ID. Deleting an unknown id is not an error.
    async fn delete(&self, id: T::Id) -> DomainResult<()>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// Observe every entity, re-emitted on each change
    fn observe_all(&self) -> LiveQuery<Vec<T>>;
}
