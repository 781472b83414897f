//! Uploaded-file metadata model.
//!
//! Only the metadata row and its access semantics live here; the bytes
//! on disk are an external concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resource::{ResourceKind, ResourceView, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Ordinary content (images, video, documents).
    Normal,
    /// Configuration payloads.
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: Uuid,
    pub original_name: String,
    /// Storage name, unique across all files.
    pub filename: String,
    pub path: String,
    pub mimetype: String,
    pub size: u64,
    pub kind: FileKind,
    pub visibility: Visibility,
    pub uploaded_by: Uuid,
    pub description: Option<String>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn resource_view(&self) -> ResourceView {
        ResourceView {
            kind: ResourceKind::File,
            id: self.id,
            owner_id: self.uploaded_by,
            visibility: Some(self.visibility),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    pub original_name: String,
    pub filename: String,
    pub path: String,
    pub mimetype: String,
    pub size: u64,
    pub kind: FileKind,
    pub visibility: Visibility,
    pub description: Option<String>,
}
