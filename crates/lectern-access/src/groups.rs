//! Group lifecycle orchestration.

use lectern_core::error::LecternResult;
use lectern_core::gate;
use lectern_core::identity::Identity;
use lectern_core::models::group::{CreateGroup, Group, GroupWithMemberCount, UpdateGroup};
use lectern_core::repository::{GroupRepository, PaginatedResult, Pagination};
use tracing::debug;
use uuid::Uuid;

use crate::error::{GROUP_DELETE_DENIED, GROUP_UPDATE_DENIED};

/// Group lifecycle service.
pub struct GroupService<G: GroupRepository> {
    groups: G,
}

impl<G: GroupRepository> GroupService<G> {
    pub fn new(groups: G) -> Self {
        Self { groups }
    }

    /// Create a group; the creator becomes its owner and the next
    /// monotonic code is assigned.
    pub async fn create(&self, input: CreateGroup, actor: &Identity) -> LecternResult<Group> {
        debug!(name = %input.name, "creating group");
        self.groups.create(input, actor.user_id).await
    }

    pub async fn get(&self, id: Uuid) -> LecternResult<Group> {
        self.groups.get_by_id(id).await
    }

    /// Update a group's attributes; owner or admin only.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateGroup,
        actor: &Identity,
    ) -> LecternResult<Group> {
        let group = self.groups.get_by_id(id).await?;
        gate::require_owner_or_admin(group.created_by, actor, GROUP_UPDATE_DENIED)?;
        self.groups.update(id, input, actor.user_id).await
    }

    /// Delete a group; owner or admin only. All memberships are
    /// removed in the same transaction.
    pub async fn delete(&self, id: Uuid, actor: &Identity) -> LecternResult<()> {
        let group = self.groups.get_by_id(id).await?;
        gate::require_owner_or_admin(group.created_by, actor, GROUP_DELETE_DENIED)?;
        debug!(group = %id, "deleting group");
        self.groups.soft_delete(id, actor.user_id).await
    }

    pub async fn list(&self, pagination: Pagination) -> LecternResult<PaginatedResult<Group>> {
        self.groups.list(pagination).await
    }

    pub async fn list_with_member_count(&self) -> LecternResult<Vec<GroupWithMemberCount>> {
        self.groups.list_with_member_count().await
    }

    pub async fn search(&self, keyword: &str) -> LecternResult<Vec<Group>> {
        self.groups.search_by_name(keyword).await
    }

    /// The highest group code currently assigned.
    pub async fn max_code(&self) -> LecternResult<i64> {
        self.groups.max_code().await
    }
}
