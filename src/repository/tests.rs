//! Repository Integration Tests
//!
//! Tests for the repositories with in-memory SQLite database.

#[cfg(test)]
mod tests {
    use crate::domain::{
        ActivityPayload, DomainError, DueDatePlacement, FoodPickupPayload, FoodType, LiveActivityEntity, SubTodoItem,
        ToDoItem,
    };
    use crate::persistence::{DbState, LiveActivityDao, TodoDao};
    use crate::repository::{LiveActivityRepository, Repository, TodoRepository};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const WINDOW: Duration = Duration::from_secs(2);

    async fn setup_test_db() -> (TodoRepository, LiveActivityRepository) {
        let db = DbState::open_in_memory().await.expect("Failed to init test DB");
        (
            TodoRepository::new(TodoDao::new(db.clone(), Duration::ZERO)),
            LiveActivityRepository::new(LiveActivityDao::new(db, Duration::ZERO)),
        )
    }

    fn pickup() -> LiveActivityEntity {
        LiveActivityEntity::new(ActivityPayload::FoodPickup(FoodPickupPayload {
            store_name: "T".to_string(),
            pickup_code: "1234".to_string(),
            food_name: "X".to_string(),
            food_type: FoodType::Unspecified,
        }))
    }

    #[tokio::test]
    async fn test_todo_crud_through_trait() {
        let (repo, _) = setup_test_db().await;

        let id = repo.insert(&ToDoItem::new("Pay rent")).await.expect("Failed to create");
        let mut found = repo.find_by_id(id).await.unwrap().expect("Missing after insert");
        assert_eq!(found.title, "Pay rent");

        found.completed = true;
        assert_eq!(repo.update(&found).await.unwrap(), 1);
        assert!(repo.find_by_id(id).await.unwrap().unwrap().completed);

        repo.delete(id).await.expect("Delete failed");
        assert!(repo.find_by_id(id).await.unwrap().is_none());

        // Second delete is a no-op
        repo.delete(id).await.expect("Repeated delete failed");
    }

    #[tokio::test]
    async fn test_sub_todo_pass_through() {
        let (repo, _) = setup_test_db().await;

        let id = repo.insert(&ToDoItem::new("Move house")).await.unwrap();
        repo.insert_sub_todos(&[SubTodoItem::new(id, "Boxes"), SubTodoItem::new(id, "Van")])
            .await
            .unwrap();
        let tape = repo.insert_sub_todo(&SubTodoItem::new(id, "Tape")).await.unwrap();

        let composite = repo.get_todo_with_sub_todos(id).await.unwrap().unwrap();
        let titles: Vec<&str> = composite.sub_todos.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Boxes", "Van", "Tape"]);

        repo.delete_sub_todo(tape).await.unwrap();
        assert_eq!(repo.get_sub_todos(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_storage_errors_propagate_unchanged() {
        let (repo, _) = setup_test_db().await;

        let err = repo.insert_sub_todo(&SubTodoItem::new(404, "Orphan")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // A failed batch leaves nothing behind
        let parent = repo.insert(&ToDoItem::new("Parent")).await.unwrap();
        let err = repo
            .insert_sub_todos(&[SubTodoItem::new(parent, "ok"), SubTodoItem::new(404, "bad")])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(repo.get_sub_todos(parent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observe_through_trait_object() {
        let (_, activities) = setup_test_db().await;
        let repo: Arc<dyn Repository<LiveActivityEntity>> = Arc::new(activities);

        let query = repo.observe_all();
        let mut sub = query.subscribe();
        assert_eq!(timeout(WINDOW, sub.next()).await.unwrap(), Some(Ok(vec![])));

        let activity = pickup();
        assert_eq!(repo.insert(&activity).await.unwrap(), activity.id());

        let seen = timeout(WINDOW, sub.next()).await.unwrap();
        assert_eq!(seen, Some(Ok(vec![activity.clone()])));
        assert_eq!(repo.find_by_id(activity.id()).await.unwrap(), Some(activity));
    }

    #[tokio::test]
    async fn test_live_activity_pass_through() {
        let (_, repo) = setup_test_db().await;

        let first = pickup();
        let second = pickup();
        let ids = repo.insert_all(&[first.clone(), second.clone()]).await.unwrap();
        assert_eq!(ids, vec![first.id(), second.id()]);

        assert_eq!(repo.set_completed(first.id(), true).await.unwrap(), 1);
        let query = repo.observe_active();
        let mut sub = query.subscribe();
        assert_eq!(timeout(WINDOW, sub.next()).await.unwrap(), Some(Ok(vec![second.clone()])));

        let mut edited = second.clone();
        edited.completed = true;
        assert_eq!(repo.update(&edited).await.unwrap(), 1);
        assert_eq!(timeout(WINDOW, sub.next()).await.unwrap(), Some(Ok(vec![])));

        repo.delete(first.id()).await.unwrap();
        assert!(repo.find_by_id(first.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_due_date_observable_pass_through() {
        let (repo, _) = setup_test_db().await;
        repo.insert_all(&[ToDoItem::new("undated"), ToDoItem::new("dated").with_due_date(chrono::Utc::now())])
            .await
            .unwrap();

        let query = repo.observe_todos_by_due_date(DueDatePlacement::Last);
        let mut sub = query.subscribe();
        let items = timeout(WINDOW, sub.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(items[0].todo.title, "dated");
        assert_eq!(items[1].todo.title, "undated");

        let all = repo.observe_todos_with_sub_todos();
        let mut sub = all.subscribe();
        let items = timeout(WINDOW, sub.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(items[0].todo.title, "undated");
    }
}
