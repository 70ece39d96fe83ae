//! View Model Layer
//!
//! Screen-scoped state holders. Each one exposes warm observable state and
//! runs its writes on a `LifecycleScope` that dies with the screen.

mod live_activity_vm;
mod scope;
mod todo_vm;

pub use live_activity_vm::LiveActivityViewModel;
pub use scope::{Completion, LifecycleScope};
pub use todo_vm::TodoViewModel;
