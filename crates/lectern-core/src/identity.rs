//! Caller identity snapshots.
//!
//! Every operation receives an [`Identity`] already verified by the
//! external authentication layer; this crate performs no credential
//! checks of its own.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account classification carried on every user and every caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    Admin,
    Regular,
}

/// An authenticated caller: who is acting, and with what standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub user_type: UserType,
}

impl Identity {
    pub fn new(user_id: Uuid, user_type: UserType) -> Self {
        Self { user_id, user_type }
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}
