//! Live Activity View Model
//!
//! Holds the observable list of live activities for a screen and runs its
//! mutations on the screen's lifecycle scope.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::scope::{Completion, LifecycleScope};
use crate::domain::{ActivityPayload, LiveActivityEntity};
use crate::persistence::{LiveQuery, Subscription};
use crate::repository::{LiveActivityRepository, Repository};

pub struct LiveActivityViewModel {
    repo: Arc<LiveActivityRepository>,
    scope: LifecycleScope,
    activities: LiveQuery<Vec<LiveActivityEntity>>,
}

impl LiveActivityViewModel {
    /// `idle_grace` is how long the list stays subscribed after the last
    /// observer leaves
    pub fn new(repo: Arc<LiveActivityRepository>, idle_grace: Duration) -> Self {
        let activities = repo
            .observe_all()
            .map_state("live_activity_state", Some(Vec::new()), idle_grace, Vec::clone);
        Self {
            repo,
            scope: LifecycleScope::new(),
            activities,
        }
    }

    /// Observe the list. Starts with an empty list until storage answers.
    pub fn activities(&self) -> Subscription<Vec<LiveActivityEntity>> {
        self.activities.subscribe()
    }

    /// Latest list that loaded successfully
    pub fn current_activities(&self) -> Vec<LiveActivityEntity> {
        match self.activities.latest() {
            Some(Ok(list)) => list,
            _ => Vec::new(),
        }
    }

    /// Create and store a new activity
    pub fn add_activity(&self, payload: ActivityPayload) -> Completion<Uuid> {
        let activity = LiveActivityEntity::new(payload);
        self.insert(activity)
    }

    pub fn insert(&self, activity: LiveActivityEntity) -> Completion<Uuid> {
        let repo = self.repo.clone();
        self.scope
            .run("insert live activity", async move { repo.insert(&activity).await })
    }

    pub fn delete(&self, id: Uuid) -> Completion<()> {
        let repo = self.repo.clone();
        self.scope
            .run("delete live activity", async move { repo.delete(id).await })
    }

    /// Mark an activity done (or not). Unknown ids are ignored.
    pub fn set_completed(&self, id: Uuid, completed: bool) -> Completion<()> {
        let repo = self.repo.clone();
        self.scope.run("complete live activity", async move {
            repo.set_completed(id, completed).await.map(|_| ())
        })
    }

    /// Tear down: cancels outstanding work
    pub fn clear(&self) {
        self.scope.cancel();
    }

    pub fn is_cleared(&self) -> bool {
        self.scope.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, ParcelPickupPayload};
    use crate::persistence::{DbState, LiveActivityDao};
    use tokio::time::{sleep, timeout};

    const WINDOW: Duration = Duration::from_secs(2);

    async fn setup() -> LiveActivityViewModel {
        let db = DbState::open_in_memory().await.unwrap();
        let repo = LiveActivityRepository::new(LiveActivityDao::new(db, Duration::from_millis(50)));
        LiveActivityViewModel::new(Arc::new(repo), Duration::from_millis(50))
    }

    fn parcel(code: &str) -> ActivityPayload {
        ActivityPayload::ParcelPickup(ParcelPickupPayload {
            company_name: "YTO".to_string(),
            pickup_code: code.to_string(),
            location: "Station 2".to_string(),
        })
    }

    #[tokio::test]
    async fn test_state_is_seeded_with_empty_list() {
        let vm = setup().await;
        assert!(vm.current_activities().is_empty());

        let sub = vm.activities();
        assert_eq!(sub.latest(), Some(Ok(vec![])));
    }

    #[tokio::test]
    async fn test_add_then_list_contains_exactly_that_record() {
        let vm = setup().await;
        let mut sub = vm.activities();

        let id = timeout(WINDOW, vm.add_activity(parcel("3-1-4")).wait())
            .await
            .unwrap()
            .unwrap();

        let list = timeout(WINDOW, sub.next_matching(|v| v.as_ref().is_ok_and(|l| !l.is_empty())))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id(), id);
        assert_eq!(list[0].payload, parcel("3-1-4"));
        assert_eq!(vm.current_activities(), list);
    }

    #[tokio::test]
    async fn test_delete_and_complete() {
        let vm = setup().await;
        let mut sub = vm.activities();

        let id = vm.add_activity(parcel("1")).wait().await.unwrap();
        vm.set_completed(id, true).wait().await.unwrap();
        let list = timeout(
            WINDOW,
            sub.next_matching(|v| v.as_ref().is_ok_and(|l| l.first().is_some_and(|a| a.completed))),
        )
        .await
        .unwrap()
        .unwrap()
        .unwrap();
        assert_eq!(list[0].id(), id);

        // Fire-and-forget: no handle kept, outcome seen through the list
        drop(vm.delete(id));
        timeout(WINDOW, sub.next_matching(|v| v.as_ref().is_ok_and(|l| l.is_empty())))
            .await
            .unwrap();

        // Unknown ids are not an error
        assert_eq!(vm.set_completed(Uuid::new_v4(), true).wait().await, Ok(()));
        assert_eq!(vm.delete(Uuid::new_v4()).wait().await, Ok(()));
    }

    #[tokio::test]
    async fn test_cleared_view_model_reports_cancelled() {
        let vm = setup().await;
        vm.clear();
        assert!(vm.is_cleared());
        assert_eq!(vm.add_activity(parcel("9")).wait().await, Err(DomainError::Cancelled));
    }

    #[tokio::test]
    async fn test_observers_share_one_upstream_subscription() {
        let db = DbState::open_in_memory().await.unwrap();
        let repo = Arc::new(LiveActivityRepository::new(LiveActivityDao::new(db, Duration::from_millis(50))));
        let vm = LiveActivityViewModel::new(repo.clone(), Duration::from_millis(50));

        let _first = vm.activities();
        let _second = vm.activities();

        let upstream = repo.observe_all();
        timeout(WINDOW, async {
            while upstream.subscriber_count() == 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(upstream.subscriber_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_toggles_land_in_issue_order() {
        let db = DbState::open_in_memory().await.unwrap();
        let repo = Arc::new(LiveActivityRepository::new(LiveActivityDao::new(db, Duration::from_millis(50))));
        let vm = LiveActivityViewModel::new(repo.clone(), Duration::from_millis(50));

        let mut ids = Vec::new();
        for n in 0..20 {
            ids.push(vm.add_activity(parcel(&n.to_string())).wait().await.unwrap());
        }

        for (n, &id) in ids.iter().enumerate() {
            drop(vm.set_completed(id, true));
            drop(vm.set_completed(id, false));
            if n % 2 == 0 {
                drop(vm.set_completed(id, true));
            }
        }
        timeout(WINDOW, vm.set_completed(Uuid::new_v4(), true).wait())
            .await
            .unwrap()
            .unwrap();

        for (n, &id) in ids.iter().enumerate() {
            let activity = repo.find_by_id(id).await.unwrap().unwrap();
            assert_eq!(activity.completed, n % 2 == 0, "activity {}", n);
            assert_eq!(activity.payload, parcel(&n.to_string()));
        }
    }
}
