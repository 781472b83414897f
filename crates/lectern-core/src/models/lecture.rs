//! Lecture domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resource::{ResourceKind, ResourceView};
use crate::models::status::EntityStatus;

/// A lecture is always permission-gated: there is no visibility tier,
/// and non-owner access requires an unexpired grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lecture {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: EntityStatus,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lecture {
    pub fn resource_view(&self) -> ResourceView {
        ResourceView {
            kind: ResourceKind::Lecture,
            id: self.id,
            owner_id: self.created_by,
            visibility: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLecture {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLecture {
    pub name: Option<String>,
    pub description: Option<String>,
}
