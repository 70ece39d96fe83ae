//! Table Invalidation
//!
//! Every committed write bumps a version counter for the tables it touched.
//! Observable queries watch the counters and re-run when one of theirs moves.

use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

/// Logical tables that observers can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Todos,
    SubTodos,
    LiveActivities,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Todos => "todos",
            Table::SubTodos => "sub_todos",
            Table::LiveActivities => "live_activities",
        }
    }

    fn index(self) -> usize {
        match self {
            Table::Todos => 0,
            Table::SubTodos => 1,
            Table::LiveActivities => 2,
        }
    }
}

/// Write counters, one per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableVersions([u64; 3]);

impl TableVersions {
    pub fn get(&self, table: Table) -> u64 {
        self.0[table.index()]
    }

    /// True if any of `tables` moved between `self` and `newer`
    pub fn changed_since(&self, newer: &TableVersions, tables: &[Table]) -> bool {
        tables.iter().any(|t| self.get(*t) != newer.get(*t))
    }
}

#[derive(Clone)]
pub struct InvalidationTracker {
    tx: Arc<watch::Sender<TableVersions>>,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(TableVersions::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn notify(&self, tables: &[Table]) {
        if tables.is_empty() {
            return;
        }
        self.tx.send_modify(|versions| {
            for table in tables {
                let slot = &mut versions.0[table.index()];
                *slot = slot.wrapping_add(1);
            }
        });
        debug!(
            "invalidated {}",
            tables.iter().map(Table::name).collect::<Vec<_>>().join(", ")
        );
    }

    pub fn subscribe(&self) -> watch::Receiver<TableVersions> {
        self.tx.subscribe()
    }

    pub fn versions(&self) -> TableVersions {
        *self.tx.borrow()
    }
}

impl Default for InvalidationTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_bumps_only_named_tables() {
        let tracker = InvalidationTracker::new();
        let before = tracker.versions();

        tracker.notify(&[Table::Todos, Table::SubTodos]);
        let after = tracker.versions();

        assert_eq!(after.get(Table::Todos), 1);
        assert_eq!(after.get(Table::SubTodos), 1);
        assert_eq!(after.get(Table::LiveActivities), 0);
        assert!(before.changed_since(&after, &[Table::Todos]));
        assert!(!before.changed_since(&after, &[Table::LiveActivities]));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let tracker = InvalidationTracker::new();
        let mut rx = tracker.subscribe();

        tracker.notify(&[Table::LiveActivities]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().get(Table::LiveActivities), 1);

        tracker.notify(&[]);
        assert!(!rx.has_changed().unwrap());
    }
}
