//! To-do View Model
//!
//! Due-date sorted to-dos with their sub-todos, plus progress statistics
//! derived from the same upstream query.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::scope::{Completion, LifecycleScope};
use crate::domain::{DueDatePlacement, SubTodoItem, ToDoItem, TodoItemWithSubTodos, TodoStats};
use crate::persistence::{LiveQuery, Subscription};
use crate::repository::{Repository, TodoRepository};

pub struct TodoViewModel {
    repo: Arc<TodoRepository>,
    scope: LifecycleScope,
    todos: LiveQuery<Vec<TodoItemWithSubTodos>>,
    stats: LiveQuery<TodoStats>,
}

impl TodoViewModel {
    pub fn new(repo: Arc<TodoRepository>, idle_grace: Duration, placement: DueDatePlacement) -> Self {
        let source = repo.observe_todos_by_due_date(placement);
        let todos = source.map_state("todo_state", Some(Vec::new()), idle_grace, Vec::clone);
        let stats = source.map_state("todo_stats", Some(TodoStats::default()), idle_grace, |items| {
            TodoStats::compute(items, Utc::now())
        });

        Self {
            repo,
            scope: LifecycleScope::new(),
            todos,
            stats,
        }
    }

    pub fn todos(&self) -> Subscription<Vec<TodoItemWithSubTodos>> {
        self.todos.subscribe()
    }

    pub fn stats(&self) -> Subscription<TodoStats> {
        self.stats.subscribe()
    }

    pub fn current_todos(&self) -> Vec<TodoItemWithSubTodos> {
        match self.todos.latest() {
            Some(Ok(items)) => items,
            _ => Vec::new(),
        }
    }

    pub fn current_stats(&self) -> TodoStats {
        match self.stats.latest() {
            Some(Ok(stats)) => stats,
            _ => TodoStats::default(),
        }
    }

    pub fn add_todo(&self, title: impl Into<String>, due_date: Option<DateTime<Utc>>) -> Completion<i64> {
        let mut todo = ToDoItem::new(title);
        if let Some(due) = due_date {
            todo = todo.with_due_date(due);
        }
        let repo = self.repo.clone();
        self.scope.run("add todo", async move { repo.insert(&todo).await })
    }

    /// Unknown ids are ignored
    pub fn set_todo_completed(&self, id: i64, completed: bool) -> Completion<()> {
        let repo = self.repo.clone();
        self.scope.run("complete todo", async move {
            repo.set_todo_completed(id, completed).await.map(|_| ())
        })
    }

    /// Unknown ids are ignored
    pub fn rename_todo(&self, id: i64, title: impl Into<String>) -> Completion<()> {
        let title = title.into();
        let repo = self.repo.clone();
        self.scope
            .run("rename todo", async move { repo.rename_todo(id, &title).await.map(|_| ()) })
    }

    pub fn delete_todo(&self, id: i64) -> Completion<()> {
        let repo = self.repo.clone();
        self.scope.run("delete todo", async move { repo.delete(id).await })
    }

    pub fn add_sub_todo(&self, todo_id: i64, title: impl Into<String>) -> Completion<i64> {
        let sub_todo = SubTodoItem::new(todo_id, title);
        let repo = self.repo.clone();
        self.scope
            .run("add sub-todo", async move { repo.insert_sub_todo(&sub_todo).await })
    }

    pub fn set_sub_todo_completed(&self, id: i64, completed: bool) -> Completion<()> {
        let repo = self.repo.clone();
        self.scope.run("complete sub-todo", async move {
            repo.set_sub_todo_completed(id, completed).await.map(|_| ())
        })
    }

    pub fn delete_sub_todo(&self, id: i64) -> Completion<()> {
        let repo = self.repo.clone();
        self.scope
            .run("delete sub-todo", async move { repo.delete_sub_todo(id).await })
    }

    pub fn clear(&self) {
        self.scope.cancel();
    }
}
