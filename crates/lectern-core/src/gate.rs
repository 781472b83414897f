//! Authorization gate.
//!
//! Thin, stateless predicates used at the top of every mutating
//! operation. They consult only the caller-supplied snapshots and the
//! caller's identity; they never re-query storage.

use uuid::Uuid;

use crate::error::{LecternError, LecternResult};
use crate::identity::Identity;
use crate::models::membership::GroupRole;

/// Pass when the actor is the resource owner or an admin.
pub fn require_owner_or_admin(owner_id: Uuid, actor: &Identity, denial: &str) -> LecternResult<()> {
    if actor.is_admin() || actor.user_id == owner_id {
        Ok(())
    } else {
        Err(LecternError::Forbidden {
            reason: denial.to_string(),
        })
    }
}

/// Pass when the actor is the group owner, an admin, or holds the
/// Leader role in the group. `actor_role` is the actor's own membership
/// role, if any.
pub fn require_leader_or_admin(
    owner_id: Uuid,
    actor_role: Option<GroupRole>,
    actor: &Identity,
    denial: &str,
) -> LecternResult<()> {
    if actor.is_admin() || actor.user_id == owner_id || actor_role == Some(GroupRole::Leader) {
        Ok(())
    } else {
        Err(LecternError::Forbidden {
            reason: denial.to_string(),
        })
    }
}
