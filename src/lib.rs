//! Todo-Live Backend
//!
//! Layered architecture:
//! - domain: Core entities, payload model and business rules
//! - persistence: SQLite storage, table invalidation and live queries
//! - repository: Storage-independent façades
//! - view_model: Screen-scoped observable state and mutations

use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod logging;
pub mod persistence;
pub mod repository;
pub mod view_model;

use config::AppConfig;
use domain::DomainResult;
use persistence::{init_db, DbState, LiveActivityDao, TodoDao};
use repository::{LiveActivityRepository, TodoRepository};
use view_model::{LiveActivityViewModel, TodoViewModel};

/// Application state shared across screens
pub struct AppState {
    pub db_state: DbState,
    pub config: AppConfig,
    pub todo_repo: Arc<TodoRepository>,
    pub live_activity_repo: Arc<LiveActivityRepository>,
}

impl AppState {
    /// Open (and migrate) the database named by `config`
    pub async fn init(config: AppConfig) -> DomainResult<Self> {
        let db_state = init_db(&config.database_path).await?;
        Ok(Self::with_db(db_state, config))
    }

    /// Same wiring over a throwaway in-memory database
    pub async fn in_memory(config: AppConfig) -> DomainResult<Self> {
        let db_state = DbState::open_in_memory().await?;
        Ok(Self::with_db(db_state, config))
    }

    fn with_db(db_state: DbState, config: AppConfig) -> Self {
        let grace = config.idle_grace();
        Self {
            todo_repo: Arc::new(TodoRepository::new(TodoDao::new(db_state.clone(), grace))),
            live_activity_repo: Arc::new(LiveActivityRepository::new(LiveActivityDao::new(db_state.clone(), grace))),
            db_state,
            config,
        }
    }

    pub fn live_activity_view_model(&self) -> LiveActivityViewModel {
        LiveActivityViewModel::new(self.live_activity_repo.clone(), self.config.idle_grace())
    }

    pub fn todo_view_model(&self) -> TodoViewModel {
        TodoViewModel::new(
            self.todo_repo.clone(),
            self.config.idle_grace(),
            self.config.due_date_placement,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityPayload, ParcelPickupPayload};
    use crate::repository::Repository;

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("data").join("todo_live.db"),
            idle_grace_ms: 0,
            ..AppConfig::default()
        };

        let state = AppState::init(config.clone()).await.unwrap();
        let todos = state.todo_view_model();
        let todo = todos.add_todo("Water plants", None).wait().await.unwrap();
        todos.add_sub_todo(todo, "Balcony").wait().await.unwrap();

        let activities = state.live_activity_view_model();
        let activity = activities
            .add_activity(ActivityPayload::ParcelPickup(ParcelPickupPayload {
                company_name: "SF".to_string(),
                pickup_code: "88-1".to_string(),
                location: "Locker 7".to_string(),
            }))
            .wait()
            .await
            .unwrap();
        drop((todos, activities, state));

        let reopened = AppState::init(config).await.unwrap();
        let restored = reopened.todo_repo.get_todo_with_sub_todos(todo).await.unwrap().unwrap();
        assert_eq!(restored.todo.title, "Water plants");
        assert_eq!(restored.sub_todos.len(), 1);

        let card = reopened.live_activity_repo.find_by_id(activity).await.unwrap().unwrap();
        assert_eq!(card.payload.pickup_code(), "88-1");
    }

    #[tokio::test]
    async fn test_in_memory_state_is_isolated() {
        let first = AppState::in_memory(AppConfig::default()).await.unwrap();
        let second = AppState::in_memory(AppConfig::default()).await.unwrap();

        first.todo_view_model().add_todo("only here", None).wait().await.unwrap();
        assert_eq!(first.todo_repo.observe_all().subscribe().next().await.unwrap().unwrap().len(), 1);
        assert!(second.todo_repo.observe_all().subscribe().next().await.unwrap().unwrap().is_empty());
    }
}
