//! To-do Repository
//!
//! Pass-through façade over `TodoDao`. Errors are returned unchanged.

use async_trait::async_trait;

use super::traits::Repository;
use crate::domain::{DomainResult, DueDatePlacement, SubTodoItem, ToDoItem, TodoItemWithSubTodos};
use crate::persistence::{LiveQuery, TodoDao};

pub struct TodoRepository {
    dao: TodoDao,
}

impl TodoRepository {
    pub fn new(dao: TodoDao) -> Self {
        Self { dao }
    }

    pub async fn get_todo_with_sub_todos(&self, id: i64) -> DomainResult<Option<TodoItemWithSubTodos>> {
        self.dao.get_todo_with_sub_todos(id).await
    }

    pub async fn set_todo_completed(&self, id: i64, completed: bool) -> DomainResult<usize> {
        self.dao.set_todo_completed(id, completed).await
    }

    pub async fn rename_todo(&self, id: i64, title: &str) -> DomainResult<usize> {
        self.dao.rename_todo(id, title).await
    }

    pub async fn insert_sub_todo(&self, sub_todo: &SubTodoItem) -> DomainResult<i64> {
        self.dao.insert_sub_todo(sub_todo).await
    }

    pub async fn insert_sub_todos(&self, sub_todos: &[SubTodoItem]) -> DomainResult<Vec<i64>> {
        self.dao.insert_sub_todos(sub_todos).await
    }

    pub async fn update_sub_todo(&self, sub_todo: &SubTodoItem) -> DomainResult<usize> {
        self.dao.update_sub_todo(sub_todo).await
    }

    pub async fn set_sub_todo_completed(&self, id: i64, completed: bool) -> DomainResult<usize> {
        self.dao.set_sub_todo_completed(id, completed).await
    }

    pub async fn delete_sub_todo(&self, id: i64) -> DomainResult<()> {
        self.dao.delete_sub_todo_by_id(id).await.map(|_| ())
    }

    pub async fn get_sub_todos(&self, todo_id: i64) -> DomainResult<Vec<SubTodoItem>> {
        self.dao.get_sub_todos(todo_id).await
    }

    pub fn observe_todos_with_sub_todos(&self) -> LiveQuery<Vec<TodoItemWithSubTodos>> {
        self.dao.observe_todos_with_sub_todos()
    }

    pub fn observe_todos_by_due_date(&self, placement: DueDatePlacement) -> LiveQuery<Vec<TodoItemWithSubTodos>> {
        self.dao.observe_todos_by_due_date(placement)
    }
}

#[async_trait]
impl Repository<ToDoItem> for TodoRepository {
    async fn insert(&self, entity: &ToDoItem) -> DomainResult<i64> {
        self.dao.insert_todo(entity).await
    }

    async fn insert_all(&self, entities: &[ToDoItem]) -> DomainResult<Vec<i64>> {
        self.dao.insert_todos(entities).await
    }

    async fn update(&self, entity: &ToDoItem) -> DomainResult<usize> {
        self.dao.update_todo(entity).await
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        self.dao.delete_todo_by_id(id).await.map(|_| ())
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<ToDoItem>> {
        self.dao.get_todo_by_id(id).await
    }

    fn observe_all(&self) -> LiveQuery<Vec<ToDoItem>> {
        self.dao.observe_todos()
    }
}
