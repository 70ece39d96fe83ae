//! Repository Layer
//!
//! Façades that keep callers independent of the storage technology.

mod live_activity_repo;
mod todo_repo;
mod traits;

#[cfg(test)]
mod tests;

pub use live_activity_repo::LiveActivityRepository;
pub use todo_repo::TodoRepository;
pub use traits::Repository;
