//! Live Activity Entity
//!
//! An at-a-glance card for a real-world event such as a food or parcel pickup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::Entity;
use super::payload::ActivityPayload;
use super::todo::truncate_to_millis;

/// A live activity record.
///
/// `id` and `created_at` are fixed at creation and have no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveActivityEntity {
    id: Uuid,
    created_at: DateTime<Utc>,
    pub payload: ActivityPayload,
    pub completed: bool,
}

impl LiveActivityEntity {
    /// Create a new activity with a fresh id, stamped now
    pub fn new(payload: ActivityPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: truncate_to_millis(Utc::now()),
            payload,
            completed: false,
        }
    }

    /// Rebuild a stored record
    pub fn from_parts(id: Uuid, created_at: DateTime<Utc>, payload: ActivityPayload, completed: bool) -> Self {
        Self {
            id,
            created_at: truncate_to_millis(created_at),
            payload,
            completed,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for LiveActivityEntity {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }
}
