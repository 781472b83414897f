//! Group domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::EntityStatus;

/// A named collection of users. The creator becomes the owner; only the
/// owner or an admin may update or delete the group. Deleting a group
/// removes all of its memberships in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    /// Human-facing code, unique and monotonically assigned at creation.
    pub code: i64,
    pub name: String,
    pub status: EntityStatus,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroup {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateGroup {
    pub name: Option<String>,
}

/// Listing row pairing a group with its current member count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupWithMemberCount {
    pub id: Uuid,
    pub code: i64,
    pub name: String,
    pub member_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
