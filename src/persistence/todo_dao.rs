//! To-do Data Access
//!
//! SQLite-backed access to the `todos` and `sub_todos` tables.
//! Writes notify the invalidation tracker once committed; observable reads
//! are `LiveQuery`s over the affected tables.

use chrono::DateTime;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;
use std::time::Duration;

use super::db::DbState;
use super::invalidation::Table;
use super::live_query::{BoxFuture, LiveQuery, QueryFn};
use crate::domain::{DomainResult, DueDatePlacement, SubTodoItem, ToDoItem, TodoItemWithSubTodos};

const SELECT_TODO: &str = "SELECT id, title, due_date, completed FROM todos";
const SELECT_SUB_TODO: &str = "SELECT id, todo_id, title, completed FROM sub_todos";

/// Data access for to-dos and their sub-todos
pub struct TodoDao {
    db: DbState,
    grace: Duration,
    todos: LiveQuery<Vec<ToDoItem>>,
    todos_with_sub_todos: LiveQuery<Vec<TodoItemWithSubTodos>>,
}

impl TodoDao {
    pub fn new(db: DbState, grace: Duration) -> Self {
        let source = db.clone();
        let fetch: QueryFn<Vec<ToDoItem>> = Arc::new(move || {
            let db = source.clone();
            Box::pin(async move { fetch_todos(&db).await }) as BoxFuture<_>
        });
        let todos = LiveQuery::from_tables("todos", db.tracker.clone(), vec![Table::Todos], grace, fetch);
        let todos_with_sub_todos = composite_query(&db, "todos_with_sub_todos", None, grace);

        Self {
            db,
            grace,
            todos,
            todos_with_sub_todos,
        }
    }

    // ---- to-dos ----

    /// Insert or replace. An id of 0 lets storage assign one.
    pub async fn insert_todo(&self, todo: &ToDoItem) -> DomainResult<i64> {
        let id = {
            let conn = self.db.conn.lock().await;
            upsert_todo(&conn, todo)?
        };
        debug!("todo {} written", id);
        self.db.notify(&[Table::Todos]);
        Ok(id)
    }

    /// Insert or replace many in one transaction
    pub async fn insert_todos(&self, todos: &[ToDoItem]) -> DomainResult<Vec<i64>> {
        if todos.is_empty() {
            return Ok(Vec::new());
        }
        let ids = {
            let mut conn = self.db.conn.lock().await;
            let tx = conn.transaction()?;
            let ids = todos
                .iter()
                .map(|todo| upsert_todo(&tx, todo))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tx.commit()?;
            ids
        };
        debug!("{} todos written", ids.len());
        self.db.notify(&[Table::Todos]);
        Ok(ids)
    }

    /// Returns the number of rows changed (0 if the id is unknown)
    pub async fn update_todo(&self, todo: &ToDoItem) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute(
                "UPDATE todos SET title = ?1, due_date = ?2, completed = ?3 WHERE id = ?4",
                params![todo.title, due_millis(todo), todo.completed, todo.id],
            )?
        };
        if changed > 0 {
            self.db.notify(&[Table::Todos]);
        }
        Ok(changed)
    }

    pub async fn set_todo_completed(&self, id: i64, completed: bool) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute(
                "UPDATE todos SET completed = ?1 WHERE id = ?2",
                params![completed, id],
            )?
        };
        if changed > 0 {
            self.db.notify(&[Table::Todos]);
        }
        Ok(changed)
    }

    pub async fn rename_todo(&self, id: i64, title: &str) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute("UPDATE todos SET title = ?1 WHERE id = ?2", params![title, id])?
        };
        if changed > 0 {
            self.db.notify(&[Table::Todos]);
        }
        Ok(changed)
    }

    /// Delete a to-do and its sub-todos. Unknown ids are a no-op.
    pub async fn delete_todo_by_id(&self, id: i64) -> DomainResult<usize> {
        let (todos, subs) = {
            let mut conn = self.db.conn.lock().await;
            let tx = conn.transaction()?;
            // Explicit cascade; the foreign key covers writers that bypass this DAO
            let subs = tx.execute("DELETE FROM sub_todos WHERE todo_id = ?1", params![id])?;
            let todos = tx.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
            tx.commit()?;
            (todos, subs)
        };

        if todos > 0 || subs > 0 {
            debug!("todo {} deleted with {} sub-todos", id, subs);
            self.db.notify(&[Table::Todos, Table::SubTodos]);
        }
        Ok(todos)
    }

    pub async fn get_todo_by_id(&self, id: i64) -> DomainResult<Option<ToDoItem>> {
        let conn = self.db.conn.lock().await;
        let todo = conn
            .query_row(&format!("{} WHERE id = ?1", SELECT_TODO), params![id], row_to_todo)
            .optional()?;
        Ok(todo)
    }

    pub async fn get_todo_with_sub_todos(&self, id: i64) -> DomainResult<Option<TodoItemWithSubTodos>> {
        let mut found = fetch_todos_with_sub_todos(&self.db, None, Some(id)).await?;
        Ok(found.pop())
    }

    // ---- sub-todos ----

    /// Insert or replace. The owning to-do must exist.
    pub async fn insert_sub_todo(&self, sub_todo: &SubTodoItem) -> DomainResult<i64> {
        let id = {
            let conn = self.db.conn.lock().await;
            upsert_sub_todo(&conn, sub_todo)?
        };
        debug!("sub-todo {} written under todo {}", id, sub_todo.todo_id);
        self.db.notify(&[Table::SubTodos]);
        Ok(id)
    }

    pub async fn insert_sub_todos(&self, sub_todos: &[SubTodoItem]) -> DomainResult<Vec<i64>> {
        if sub_todos.is_empty() {
            return Ok(Vec::new());
        }
        let ids = {
            let mut conn = self.db.conn.lock().await;
            let tx = conn.transaction()?;
            let ids = sub_todos
                .iter()
                .map(|sub_todo| upsert_sub_todo(&tx, sub_todo))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tx.commit()?;
            ids
        };
        self.db.notify(&[Table::SubTodos]);
        Ok(ids)
    }

    pub async fn update_sub_todo(&self, sub_todo: &SubTodoItem) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute(
                "UPDATE sub_todos SET todo_id = ?1, title = ?2, completed = ?3 WHERE id = ?4",
                params![sub_todo.todo_id, sub_todo.title, sub_todo.completed, sub_todo.id],
            )?
        };
        if changed > 0 {
            self.db.notify(&[Table::SubTodos]);
        }
        Ok(changed)
    }

    pub async fn set_sub_todo_completed(&self, id: i64, completed: bool) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute(
                "UPDATE sub_todos SET completed = ?1 WHERE id = ?2",
                params![completed, id],
            )?
        };
        if changed > 0 {
            self.db.notify(&[Table::SubTodos]);
        }
        Ok(changed)
    }

    pub async fn delete_sub_todo_by_id(&self, id: i64) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute("DELETE FROM sub_todos WHERE id = ?1", params![id])?
        };
        if changed > 0 {
            self.db.notify(&[Table::SubTodos]);
        }
        Ok(changed)
    }

    /// Sub-todos of one to-do in creation order
    pub async fn get_sub_todos(&self, todo_id: i64) -> DomainResult<Vec<SubTodoItem>> {
        let conn = self.db.conn.lock().await;
        let mut stmt = conn.prepare(&format!("{} WHERE todo_id = ?1 ORDER BY id", SELECT_SUB_TODO))?;
        let sub_todos = stmt
            .query_map(params![todo_id], row_to_sub_todo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sub_todos)
    }

    // ---- observable queries ----

    /// All to-dos by id
    pub fn observe_todos(&self) -> LiveQuery<Vec<ToDoItem>> {
        self.todos.clone()
    }

    /// All to-dos by id, each with its sub-todos
    pub fn observe_todos_with_sub_todos(&self) -> LiveQuery<Vec<TodoItemWithSubTodos>> {
        self.todos_with_sub_todos.clone()
    }

    /// All to-dos with sub-todos, sorted by due date
    pub fn observe_todos_by_due_date(&self, placement: DueDatePlacement) -> LiveQuery<Vec<TodoItemWithSubTodos>> {
        composite_query(&self.db, "todos_by_due_date", Some(placement), self.grace)
    }
}

fn composite_query(
    db: &DbState,
    name: &str,
    placement: Option<DueDatePlacement>,
    grace: Duration,
) -> LiveQuery<Vec<TodoItemWithSubTodos>> {
    let source = db.clone();
    let fetch: QueryFn<Vec<TodoItemWithSubTodos>> = Arc::new(move || {
        let db = source.clone();
        Box::pin(async move { fetch_todos_with_sub_todos(&db, placement, None).await }) as BoxFuture<_>
    });
    LiveQuery::from_tables(
        name,
        db.tracker.clone(),
        vec![Table::Todos, Table::SubTodos],
        grace,
        fetch,
    )
}

fn due_millis(todo: &ToDoItem) -> Option<i64> {
    todo.due_date().map(|due| due.timestamp_millis())
}

fn upsert_todo(conn: &Connection, todo: &ToDoItem) -> rusqlite::Result<i64> {
    if todo.id == 0 {
        conn.execute(
            "INSERT INTO todos (title, due_date, completed) VALUES (?1, ?2, ?3)",
            params![todo.title, due_millis(todo), todo.completed],
        )?;
        return Ok(conn.last_insert_rowid());
    }

    // Upsert rather than REPLACE so the row is never deleted and its
    // sub-todos survive; every column is overwritten.
    conn.execute(
        "INSERT INTO todos (id, title, due_date, completed) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            due_date = excluded.due_date,
            completed = excluded.completed",
        params![todo.id, todo.title, due_millis(todo), todo.completed],
    )?;
    Ok(todo.id)
}

fn upsert_sub_todo(conn: &Connection, sub_todo: &SubTodoItem) -> rusqlite::Result<i64> {
    if sub_todo.id == 0 {
        conn.execute(
            "INSERT INTO sub_todos (todo_id, title, completed) VALUES (?1, ?2, ?3)",
            params![sub_todo.todo_id, sub_todo.title, sub_todo.completed],
        )?;
        return Ok(conn.last_insert_rowid());
    }

    conn.execute(
        "INSERT INTO sub_todos (id, todo_id, title, completed) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            todo_id = excluded.todo_id,
            title = excluded.title,
            completed = excluded.completed",
        params![sub_todo.id, sub_todo.todo_id, sub_todo.title, sub_todo.completed],
    )?;
    Ok(sub_todo.id)
}

async fn fetch_todos(db: &DbState) -> DomainResult<Vec<ToDoItem>> {
    let conn = db.conn.lock().await;
    let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_TODO))?;
    let todos = stmt
        .query_map([], row_to_todo)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(todos)
}

fn parent_order(placement: Option<DueDatePlacement>) -> &'static str {
    match placement {
        None => "t.id",
        Some(DueDatePlacement::Last) => "t.due_date IS NULL, t.due_date, t.id",
        Some(DueDatePlacement::First) => "t.due_date IS NOT NULL, t.due_date, t.id",
    }
}

/// Join to-dos with their sub-todos and group rows by parent
async fn fetch_todos_with_sub_todos(
    db: &DbState,
    placement: Option<DueDatePlacement>,
    only: Option<i64>,
) -> DomainResult<Vec<TodoItemWithSubTodos>> {
    let filter = if only.is_some() { "WHERE t.id = ?1" } else { "" };
    let sql = format!(
        "SELECT t.id, t.title, t.due_date, t.completed, s.id, s.todo_id, s.title, s.completed
         FROM todos t
         LEFT JOIN sub_todos s ON s.todo_id = t.id
         {}
         ORDER BY {}, s.id",
        filter,
        parent_order(placement)
    );

    let conn = db.conn.lock().await;
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match only {
        Some(id) => stmt.query(params![id])?,
        None => stmt.query([])?,
    };

    let mut grouped: Vec<TodoItemWithSubTodos> = Vec::new();
    while let Some(row) = rows.next()? {
        let todo = row_to_todo(row)?;
        let sub_todo = match row.get::<_, Option<i64>>(4)? {
            Some(sub_id) => Some(SubTodoItem {
                id: sub_id,
                todo_id: row.get(5)?,
                title: row.get(6)?,
                completed: row.get(7)?,
            }),
            None => None,
        };

        match grouped.last() {
            Some(last) if last.todo.id == todo.id => {}
            _ => grouped.push(TodoItemWithSubTodos::new(todo)),
        }
        if let (Some(sub_todo), Some(last)) = (sub_todo, grouped.last_mut()) {
            last.sub_todos.push(sub_todo);
        }
    }
    Ok(grouped)
}

/// Convert a database row to ToDoItem
fn row_to_todo(row: &Row) -> rusqlite::Result<ToDoItem> {
    let mut todo = ToDoItem::new(row.get::<_, String>(1)?).with_id(row.get(0)?);
    todo.set_due_date(
        row.get::<_, Option<i64>>(2)?
            .and_then(DateTime::from_timestamp_millis),
    );
    todo.completed = row.get(3)?;
    Ok(todo)
}

fn row_to_sub_todo(row: &Row) -> rusqlite::Result<SubTodoItem> {
    Ok(SubTodoItem {
        id: row.get(0)?,
        todo_id: row.get(1)?,
        title: row.get(2)?,
        completed: row.get(3)?,
    })
}
