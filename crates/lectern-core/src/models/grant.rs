//! Access grant domain model and the capability order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resource::ResourceKind;

/// Ordered access level. The derive order is load-bearing:
/// `View < Download < Full`, and every capability comparison in the
/// system goes through [`Capability::allows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    View,
    Download,
    Full,
}

impl Capability {
    /// True when a holder of `self` satisfies a requirement of
    /// `required`.
    pub fn allows(self, required: Capability) -> bool {
        self >= required
    }
}

/// A time-bounded, revocable grant of a capability from a grantor to a
/// subject over one resource. At most one row exists per
/// (resource_kind, resource_id, subject_id); re-granting overwrites in
/// place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: Uuid,
    pub resource_kind: ResourceKind,
    pub resource_id: Uuid,
    pub subject_id: Uuid,
    pub capability: Capability,
    pub granted_by: Uuid,
    /// Past-dated grants are treated as absent at decision time; they
    /// are not eagerly deleted.
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessGrant {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}
