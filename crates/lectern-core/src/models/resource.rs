//! Resource abstraction consumed by the access resolver.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kinds of resource a grant can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Lecture,
    File,
}

/// Resource-level default access policy. Files carry one of these;
/// lectures have no visibility concept and are always permission-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Anyone may view.
    Public,
    /// Only the owner (and admins) may access.
    Private,
    /// Only explicitly granted subjects may access.
    Restricted,
}

/// The snapshot of a resource the resolver decides against: who owns
/// it, and what its default policy is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceView {
    pub kind: ResourceKind,
    pub id: Uuid,
    pub owner_id: Uuid,
    pub visibility: Option<Visibility>,
}
