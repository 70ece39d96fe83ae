//! Live Activity Data Access
//!
//! The payload column holds the tagged JSON form of `ActivityPayload`;
//! conversion happens here so callers only ever see the enum.

use chrono::DateTime;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::db::DbState;
use super::invalidation::Table;
use super::live_query::{BoxFuture, LiveQuery, QueryFn};
use crate::domain::{ActivityPayload, DomainError, DomainResult, LiveActivityEntity};

const SELECT_ACTIVITY: &str = "SELECT id, created_at, payload, completed FROM live_activities";

/// A row as stored, before the payload is decoded
struct StoredActivity {
    id: String,
    created_at: i64,
    payload: String,
    completed: bool,
}

impl StoredActivity {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            payload: row.get(2)?,
            completed: row.get(3)?,
        })
    }

    fn into_entity(self) -> DomainResult<LiveActivityEntity> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DomainError::Decode(format!("Bad live activity id {}: {}", self.id, e)))?;
        let created_at = DateTime::from_timestamp_millis(self.created_at)
            .ok_or_else(|| DomainError::Decode(format!("Bad timestamp {} on {}", self.created_at, id)))?;
        let payload = ActivityPayload::decode(&self.payload)?;
        Ok(LiveActivityEntity::from_parts(id, created_at, payload, self.completed))
    }
}

/// Data access for live activity records
pub struct LiveActivityDao {
    db: DbState,
    all: LiveQuery<Vec<LiveActivityEntity>>,
    active: LiveQuery<Vec<LiveActivityEntity>>,
}

impl LiveActivityDao {
    pub fn new(db: DbState, grace: Duration) -> Self {
        let all = activity_query(&db, "live_activities", false, grace);
        let active = activity_query(&db, "active_live_activities", true, grace);
        Self { db, all, active }
    }

    /// Insert or replace by id
    pub async fn insert(&self, activity: &LiveActivityEntity) -> DomainResult<()> {
        let payload = activity.payload.encode()?;
        {
            let conn = self.db.conn.lock().await;
            upsert_activity(&conn, activity, &payload)?;
        }
        debug!("live activity {} ({}) written", activity.id(), activity.payload.kind());
        self.db.notify(&[Table::LiveActivities]);
        Ok(())
    }

    pub async fn insert_all(&self, activities: &[LiveActivityEntity]) -> DomainResult<()> {
        if activities.is_empty() {
            return Ok(());
        }
        let encoded = activities
            .iter()
            .map(|activity| activity.payload.encode())
            .collect::<DomainResult<Vec<_>>>()?;
        {
            let mut conn = self.db.conn.lock().await;
            let tx = conn.transaction()?;
            for (activity, payload) in activities.iter().zip(&encoded) {
                upsert_activity(&tx, activity, payload)?;
            }
            tx.commit()?;
        }
        self.db.notify(&[Table::LiveActivities]);
        Ok(())
    }

    /// Overwrite payload and completion of an existing record
    pub async fn update(&self, activity: &LiveActivityEntity) -> DomainResult<usize> {
        let payload = activity.payload.encode()?;
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute(
                "UPDATE live_activities SET payload = ?1, completed = ?2 WHERE id = ?3",
                params![payload, activity.completed, activity.id().to_string()],
            )?
        };
        if changed > 0 {
            self.db.notify(&[Table::LiveActivities]);
        }
        Ok(changed)
    }

    pub async fn set_completed(&self, id: Uuid, completed: bool) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute(
                "UPDATE live_activities SET completed = ?1 WHERE id = ?2",
                params![completed, id.to_string()],
            )?
        };
        if changed > 0 {
            self.db.notify(&[Table::LiveActivities]);
        }
        Ok(changed)
    }

    /// Unknown ids are a no-op
    pub async fn delete_by_id(&self, id: Uuid) -> DomainResult<usize> {
        let changed = {
            let conn = self.db.conn.lock().await;
            conn.execute("DELETE FROM live_activities WHERE id = ?1", params![id.to_string()])?
        };
        if changed > 0 {
            debug!("live activity {} deleted", id);
            self.db.notify(&[Table::LiveActivities]);
        }
        Ok(changed)
    }

    pub async fn get_by_id(&self, id: Uuid) -> DomainResult<Option<LiveActivityEntity>> {
        let stored = {
            let conn = self.db.conn.lock().await;
            conn.query_row(
                &format!("{} WHERE id = ?1", SELECT_ACTIVITY),
                params![id.to_string()],
                StoredActivity::from_row,
            )
            .optional()?
        };
        stored.map(StoredActivity::into_entity).transpose()
    }

    /// Every record, newest first
    pub fn observe_all(&self) -> LiveQuery<Vec<LiveActivityEntity>> {
        self.all.clone()
    }

    /// Records not yet completed, newest first
    pub fn observe_active(&self) -> LiveQuery<Vec<LiveActivityEntity>> {
        self.active.clone()
    }
}

fn activity_query(db: &DbState, name: &str, active_only: bool, grace: Duration) -> LiveQuery<Vec<LiveActivityEntity>> {
    let source = db.clone();
    let fetch: QueryFn<Vec<LiveActivityEntity>> = Arc::new(move || {
        let db = source.clone();
        Box::pin(async move { fetch_activities(&db, active_only).await }) as BoxFuture<_>
    });
    LiveQuery::from_tables(name, db.tracker.clone(), vec![Table::LiveActivities], grace, fetch)
}

fn upsert_activity(conn: &Connection, activity: &LiveActivityEntity, payload: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO live_activities (id, created_at, payload, completed) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            created_at = excluded.created_at,
            payload = excluded.payload,
            completed = excluded.completed",
        params![
            activity.id().to_string(),
            activity.created_at().timestamp_millis(),
            payload,
            activity.completed
        ],
    )
}

async fn fetch_activities(db: &DbState, active_only: bool) -> DomainResult<Vec<LiveActivityEntity>> {
    let filter = if active_only { "WHERE completed = 0" } else { "" };
    let stored = {
        let conn = db.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "{} {} ORDER BY created_at DESC, id",
            SELECT_ACTIVITY, filter
        ))?;
        let rows = stmt
            .query_map([], StoredActivity::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    stored.into_iter().map(StoredActivity::into_entity).collect()
}
