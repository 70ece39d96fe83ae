//! Live Activity Repository
//!
//! Pass-through façade over `LiveActivityDao`.

use async_trait::async_trait;
use uuid::Uuid;

use super::traits::Repository;
use crate::domain::{DomainResult, LiveActivityEntity};
use crate::persistence::{LiveActivityDao, LiveQuery};

pub struct LiveActivityRepository {
    dao: LiveActivityDao,
}

impl LiveActivityRepository {
    pub fn new(dao: LiveActivityDao) -> Self {
        Self { dao }
    }

    pub async fn set_completed(&self, id: Uuid, completed: bool) -> DomainResult<usize> {
        self.dao.set_completed(id, completed).await
    }

    pub fn observe_active(&self) -> LiveQuery<Vec<LiveActivityEntity>> {
        self.dao.observe_active()
    }
}

#[async_trait]
impl Repository<LiveActivityEntity> for LiveActivityRepository {
    async fn insert(&self, entity: &LiveActivityEntity) -> DomainResult<Uuid> {
        self.dao.insert(entity).await.map(|_| entity.id())
    }

    async fn insert_all(&self, entities: &[LiveActivityEntity]) -> DomainResult<Vec<Uuid>> {
        self.dao.insert_all(entities).await?;
        Ok(entities.iter().map(LiveActivityEntity::id).collect())
    }

    async fn update(&self, entity: &LiveActivityEntity) -> DomainResult<usize> {
        self.dao.update(entity).await
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        self.dao.delete_by_id(id).await.map(|_| ())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<LiveActivityEntity>> {
        self.dao.get_by_id(id).await
    }

    fn observe_all(&self) -> LiveQuery<Vec<LiveActivityEntity>> {
        self.dao.observe_all()
    }
}
