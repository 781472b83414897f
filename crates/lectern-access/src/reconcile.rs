//! Membership reconciler.
//!
//! Every mutation of the (group, user, role) junction flows through
//! this service: the full-set reconcile, the narrower add/remove entry
//! points, single role updates, and the user-axis reconcile used when
//! a user's group list is edited. All of them compute a delta against
//! the stored set and hand it to the repository as one atomic change,
//! so a pair can never be duplicated or half-written.

use std::collections::HashSet;

use lectern_core::error::{LecternError, LecternResult};
use lectern_core::gate;
use lectern_core::identity::Identity;
use lectern_core::models::group::Group;
use lectern_core::models::membership::{self, GroupRole, MemberSpec, Membership, MembershipDelta};
use lectern_core::repository::{GroupRepository, MembershipRepository, UserRepository};
use tracing::debug;
use uuid::Uuid;

use crate::error::{
    ADD_MEMBER_DENIED, AccessError, RECONCILE_DENIED, REMOVE_MEMBER_DENIED, ROLE_CHANGE_DENIED,
    USER_GROUPS_DENIED,
};

/// Membership reconciliation service.
///
/// Generic over repository implementations so that this layer has no
/// dependency on the database crate.
pub struct MembershipService<G, U, M>
where
    G: GroupRepository,
    U: UserRepository,
    M: MembershipRepository,
{
    groups: G,
    users: U,
    memberships: M,
}

impl<G, U, M> MembershipService<G, U, M>
where
    G: GroupRepository,
    U: UserRepository,
    M: MembershipRepository,
{
    pub fn new(groups: G, users: U, memberships: M) -> Self {
        Self {
            groups,
            users,
            memberships,
        }
    }

    /// Bring a group's membership to exactly `desired`.
    ///
    /// Users present on both sides with a different role get an
    /// in-place role update; everyone else is added or removed. The
    /// whole delta commits as one transaction, and a second call with
    /// the same set performs zero writes.
    ///
    /// Admins and the group owner may apply any delta; a group Leader
    /// may apply a delta that only changes roles.
    pub async fn reconcile(
        &self,
        group_id: Uuid,
        desired: Vec<MemberSpec>,
        actor: &Identity,
    ) -> LecternResult<()> {
        let group = self.groups.get_by_id(group_id).await?;

        // Owner and admin are settled immediately; anyone else must at
        // least be a Leader of the group to proceed at all.
        let leader_only = if Self::is_privileged(&group, actor) {
            false
        } else {
            match self.memberships.find(group_id, actor.user_id).await? {
                Some(m) if m.role == GroupRole::Leader => true,
                _ => {
                    return Err(LecternError::Forbidden {
                        reason: RECONCILE_DENIED.into(),
                    });
                }
            }
        };

        self.ensure_users_exist(desired.iter().map(|s| s.user_id))
            .await?;

        let current = self.memberships.list_for_group(group_id).await?;
        let delta = membership::diff(&current, &desired);
        if delta.is_empty() {
            return Ok(());
        }
        if leader_only && !delta.is_role_update_only() {
            return Err(LecternError::Forbidden {
                reason: RECONCILE_DENIED.into(),
            });
        }

        debug!(
            group = %group_id,
            removed = delta.to_remove.len(),
            updated = delta.to_update.len(),
            added = delta.to_add.len(),
            "reconciling group membership"
        );
        self.memberships
            .apply_delta(group_id, delta, actor.user_id)
            .await
    }

    /// Add the given pairs; pairs that already exist are no-ops with
    /// their stored role untouched.
    pub async fn add_members(
        &self,
        group_id: Uuid,
        specs: Vec<MemberSpec>,
        actor: &Identity,
    ) -> LecternResult<()> {
        let group = self.groups.get_by_id(group_id).await?;
        gate::require_owner_or_admin(group.created_by, actor, ADD_MEMBER_DENIED)?;

        self.ensure_users_exist(specs.iter().map(|s| s.user_id))
            .await?;

        let current = self.memberships.list_for_group(group_id).await?;
        let delta = membership::diff_additions(&current, &specs);
        if delta.is_empty() {
            return Ok(());
        }
        self.memberships
            .apply_delta(group_id, delta, actor.user_id)
            .await
    }

    /// Remove the given users; ids without a stored pair are no-ops.
    pub async fn remove_members(
        &self,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
        actor: &Identity,
    ) -> LecternResult<()> {
        let group = self.groups.get_by_id(group_id).await?;
        gate::require_owner_or_admin(group.created_by, actor, REMOVE_MEMBER_DENIED)?;

        let current = self.memberships.list_for_group(group_id).await?;
        let delta = membership::diff_removals(&current, &user_ids);
        if delta.is_empty() {
            return Ok(());
        }
        self.memberships
            .apply_delta(group_id, delta, actor.user_id)
            .await
    }

    /// Change one member's role in place.
    pub async fn update_member_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
        actor: &Identity,
    ) -> LecternResult<()> {
        let group = self.groups.get_by_id(group_id).await?;
        let actor_role = self
            .memberships
            .find(group_id, actor.user_id)
            .await?
            .map(|m| m.role);
        gate::require_leader_or_admin(group.created_by, actor_role, actor, ROLE_CHANGE_DENIED)?;

        let target = self
            .memberships
            .find(group_id, user_id)
            .await?
            .ok_or_else(|| LecternError::NotFound {
                entity: "membership".into(),
                id: user_id.to_string(),
            })?;
        if target.role == role {
            return Ok(());
        }

        let delta = MembershipDelta {
            to_update: vec![MemberSpec::new(user_id, role)],
            ..Default::default()
        };
        self.memberships
            .apply_delta(group_id, delta, actor.user_id)
            .await
    }

    /// Bring one user's group set to exactly `desired_groups`,
    /// joining new groups as Member and keeping existing roles on
    /// retained groups. Admin-only.
    pub async fn reconcile_user_groups(
        &self,
        user_id: Uuid,
        desired_groups: Vec<Uuid>,
        actor: &Identity,
    ) -> LecternResult<()> {
        if !actor.is_admin() {
            return Err(LecternError::Forbidden {
                reason: USER_GROUPS_DENIED.into(),
            });
        }
        self.users.get_by_id(user_id).await?;

        let desired: HashSet<Uuid> = desired_groups.into_iter().collect();
        let found = self
            .groups
            .existing_ids(desired.iter().copied().collect())
            .await?;
        if found.len() != desired.len() {
            return Err(AccessError::GroupsMissing.into());
        }

        let current: HashSet<Uuid> = self
            .memberships
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|m| m.group_id)
            .collect();

        let to_remove: Vec<Uuid> = current.difference(&desired).copied().collect();
        let to_add: Vec<Uuid> = desired.difference(&current).copied().collect();
        if to_remove.is_empty() && to_add.is_empty() {
            return Ok(());
        }

        self.memberships
            .apply_user_delta(user_id, to_remove, to_add, actor.user_id)
            .await
    }

    /// Members of a group, with roles.
    pub async fn members_of(&self, group_id: Uuid) -> LecternResult<Vec<Membership>> {
        self.groups.get_by_id(group_id).await?;
        self.memberships.list_for_group(group_id).await
    }

    /// Groups a user belongs to, with roles.
    pub async fn groups_of(&self, user_id: Uuid) -> LecternResult<Vec<Membership>> {
        self.users.get_by_id(user_id).await?;
        self.memberships.list_for_user(user_id).await
    }

    /// The user's role in the group, if they are a member.
    pub async fn role_of(&self, group_id: Uuid, user_id: Uuid) -> LecternResult<Option<GroupRole>> {
        Ok(self
            .memberships
            .find(group_id, user_id)
            .await?
            .map(|m| m.role))
    }

    fn is_privileged(group: &Group, actor: &Identity) -> bool {
        actor.is_admin() || group.created_by == actor.user_id
    }

    /// Reject the whole batch before any write when any referenced
    /// user is unknown.
    async fn ensure_users_exist(
        &self,
        ids: impl Iterator<Item = Uuid>,
    ) -> LecternResult<()> {
        let unique: HashSet<Uuid> = ids.collect();
        if unique.is_empty() {
            return Ok(());
        }
        let found = self
            .users
            .existing_ids(unique.iter().copied().collect())
            .await?;
        if found.len() != unique.len() {
            return Err(AccessError::UsersMissing.into());
        }
        Ok(())
    }
}
