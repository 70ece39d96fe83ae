//! Progress statistics over to-do items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::todo::TodoItemWithSubTodos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    /// Incomplete items past their due date
    pub overdue: usize,
    pub sub_total: usize,
    pub sub_completed: usize,
}

impl TodoStats {
    pub fn compute(items: &[TodoItemWithSubTodos], now: DateTime<Utc>) -> Self {
        items.iter().fold(Self::default(), |mut stats, item| {
            stats.total += 1;
            if item.todo.completed {
                stats.completed += 1;
            }
            if item.todo.is_overdue(now) {
                stats.overdue += 1;
            }
            stats.sub_total += item.sub_todos.len();
            stats.sub_completed += item.completed_sub_todos();
            stats
        })
    }

    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// Completed share of to-dos, 0.0 when there are none
    pub fn completion_ratio(&self) -> f64 {
        ratio(self.completed, self.total)
    }

    pub fn sub_completion_ratio(&self) -> f64 {
        ratio(self.sub_completed, self.sub_total)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
