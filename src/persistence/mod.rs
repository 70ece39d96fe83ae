//! Persistence Layer
//!
//! SQLite storage for to-dos, sub-todos and live activities, with
//! observable queries that re-emit after every relevant write.

mod db;
mod invalidation;
mod live_activity_dao;
mod live_query;
mod todo_dao;


pub use db::{init_db, DbState};
pub use invalidation::{InvalidationTracker, Table, TableVersions};
pub use live_activity_dao::LiveActivityDao;
pub use live_query::{BoxFuture, LiveQuery, QueryFn, Subscription};
pub use todo_dao::TodoDao;
