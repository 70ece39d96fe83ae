//! To-do Entities
//!
//! A to-do item owns an ordered list of sub-todos. The composite view pairs
//! them at read time and is never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::entity::Entity;

/// Drop sub-millisecond precision so values survive a storage round-trip
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.map(truncate_to_millis))
}

/// A user task with optional due date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDoItem {
    /// Unique identifier (0 = not yet stored)
    pub id: i64,
    pub title: String,
    /// Millisecond precision, matching what storage keeps
    #[serde(default, deserialize_with = "deserialize_due_date")]
    due_date: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl ToDoItem {
    /// Create an unsaved item; storage assigns the id on insert
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            due_date: None,
            completed: false,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.set_due_date(Some(due));
        self
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn set_due_date(&mut self, due: Option<DateTime<Utc>>) {
        self.due_date = due.map(truncate_to_millis);
    }

    /// Incomplete and due strictly before `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }
}

impl Entity for ToDoItem {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A child task owned by exactly one to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTodoItem {
    pub id: i64,
    /// Owning to-do
    pub todo_id: i64,
    pub title: String,
    pub completed: bool,
}

impl SubTodoItem {
    pub fn new(todo_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            todo_id,
            title: title.into(),
            completed: false,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}

impl Entity for SubTodoItem {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A to-do with its sub-todos in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItemWithSubTodos {
    pub todo: ToDoItem,
    pub sub_todos: Vec<SubTodoItem>,
}

impl TodoItemWithSubTodos {
    pub fn new(todo: ToDoItem) -> Self {
        Self {
            todo,
            sub_todos: Vec::new(),
        }
    }

    pub fn completed_sub_todos(&self) -> usize {
        self.sub_todos.iter().filter(|s| s.completed).count()
    }
}

/// Where items without a due date go when sorting by due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DueDatePlacement {
    /// After every dated item
    #[default]
    Last,
    /// Before every dated item
    First,
}
