//! Membership domain model and delta computation.
//!
//! A membership is a (group, user, role) row. The pair (group_id,
//! user_id) is unique; the role is never null once the row exists. All
//! mutations flow through the reconciler, which computes a
//! [`MembershipDelta`] here and hands it to the repository for atomic
//! application.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a user holds within one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupRole {
    Member,
    Leader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One desired (user, role) pair in a target membership set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub user_id: Uuid,
    pub role: GroupRole,
}

impl MemberSpec {
    pub fn new(user_id: Uuid, role: GroupRole) -> Self {
        Self { user_id, role }
    }

    pub fn member(user_id: Uuid) -> Self {
        Self::new(user_id, GroupRole::Member)
    }

    pub fn leader(user_id: Uuid) -> Self {
        Self::new(user_id, GroupRole::Leader)
    }
}

/// The minimal change set bringing a stored membership set to a desired
/// one. Applied by the repository as removals, then role updates, then
/// insertions, inside one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub to_remove: Vec<Uuid>,
    pub to_update: Vec<MemberSpec>,
    pub to_add: Vec<MemberSpec>,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_update.is_empty() && self.to_add.is_empty()
    }

    /// True when the delta changes roles only, without adding or
    /// removing any member.
    pub fn is_role_update_only(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty() && !self.to_update.is_empty()
    }
}

/// Diff a stored membership set against a full desired set, keyed by
/// user id.
///
/// A user present in both sides with a different role becomes an
/// in-place role update, preserving the row and its creation audit
/// trail. Duplicate user ids in `desired` collapse to the last
/// occurrence.
pub fn diff(current: &[Membership], desired: &[MemberSpec]) -> MembershipDelta {
    let mut target: HashMap<Uuid, GroupRole> = HashMap::with_capacity(desired.len());
    let mut order: Vec<Uuid> = Vec::with_capacity(desired.len());
    for spec in desired {
        if target.insert(spec.user_id, spec.role).is_none() {
            order.push(spec.user_id);
        }
    }

    let mut delta = MembershipDelta::default();

    for row in current {
        match target.get(&row.user_id) {
            None => delta.to_remove.push(row.user_id),
            Some(role) if *role != row.role => {
                delta.to_update.push(MemberSpec::new(row.user_id, *role));
            }
            Some(_) => {}
        }
    }

    let existing: HashMap<Uuid, GroupRole> =
        current.iter().map(|m| (m.user_id, m.role)).collect();
    for user_id in order {
        if !existing.contains_key(&user_id) {
            delta.to_add.push(MemberSpec::new(user_id, target[&user_id]));
        }
    }

    delta
}

/// Delta for an add-only call: pairs that already exist are skipped
/// (their stored role untouched), so inserting an existing pair is a
/// no-op rather than an error or a duplicate row.
pub fn diff_additions(current: &[Membership], specs: &[MemberSpec]) -> MembershipDelta {
    let existing: HashMap<Uuid, GroupRole> =
        current.iter().map(|m| (m.user_id, m.role)).collect();
    let mut delta = MembershipDelta::default();
    for spec in specs {
        if !existing.contains_key(&spec.user_id)
            && !delta.to_add.iter().any(|s| s.user_id == spec.user_id)
        {
            delta.to_add.push(*spec);
        }
    }
    delta
}

/// Delta for a remove-only call: ids without a stored pair are skipped.
pub fn diff_removals(current: &[Membership], user_ids: &[Uuid]) -> MembershipDelta {
    let mut delta = MembershipDelta::default();
    for row in current {
        if user_ids.contains(&row.user_id) && !delta.to_remove.contains(&row.user_id) {
            delta.to_remove.push(row.user_id);
        }
    }
    delta
}
