//! Lifecycle status shared by soft-deletable entities.

use serde::{Deserialize, Serialize};

/// Soft-delete marker. Deleted rows stay in storage but are excluded
/// from every read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityStatus {
    Active,
    Deleted,
}
