//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! No storage or runtime dependencies live here.

mod entity;
mod live_activity;
mod payload;
mod stats;
mod todo;

pub use entity::{DomainError, DomainResult, Entity};
pub use live_activity::LiveActivityEntity;
pub use payload::{ActivityPayload, FoodPickupPayload, FoodType, ParcelPickupPayload, PAYLOAD_TYPE_FIELD};
pub use stats::TodoStats;
pub use todo::{truncate_to_millis, DueDatePlacement, SubTodoItem, ToDoItem, TodoItemWithSubTodos};
