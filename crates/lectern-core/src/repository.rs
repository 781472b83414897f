//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Multi-row mutations
//! ([`MembershipRepository::apply_delta`],
//! [`GrantRepository::upsert_many`]) must execute as a single atomic
//! unit: either the whole change set becomes visible or none of it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LecternResult;
use crate::models::{
    file::{CreateFile, StoredFile},
    grant::{AccessGrant, Capability},
    group::{CreateGroup, Group, GroupWithMemberCount, UpdateGroup},
    lecture::{CreateLecture, Lecture, UpdateLecture},
    membership::{Membership, MembershipDelta},
    resource::{ResourceKind, ResourceView},
    user::{CreateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = LecternResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LecternResult<User>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = LecternResult<PaginatedResult<User>>> + Send;

    /// Batched existence check: returns the subset of `ids` that
    /// resolve to a stored user. Callers compare the cardinality to
    /// reject batches referencing unknown users before any write.
    fn existing_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> impl Future<Output = LecternResult<Vec<Uuid>>> + Send;
}

// ---------------------------------------------------------------------------
// Groups & memberships
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    /// Create a group owned by `actor`, assigning the next monotonic
    /// code.
    fn create(
        &self,
        input: CreateGroup,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<Group>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LecternResult<Group>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateGroup,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<Group>> + Send;
    /// Soft-delete the group and remove all of its membership rows in
    /// the same transaction.
    fn soft_delete(&self, id: Uuid, actor: Uuid) -> impl Future<Output = LecternResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = LecternResult<PaginatedResult<Group>>> + Send;
    fn list_with_member_count(
        &self,
    ) -> impl Future<Output = LecternResult<Vec<GroupWithMemberCount>>> + Send;
    fn search_by_name(
        &self,
        keyword: &str,
    ) -> impl Future<Output = LecternResult<Vec<Group>>> + Send;
    fn max_code(&self) -> impl Future<Output = LecternResult<i64>> + Send;

    /// Batched existence check over active groups.
    fn existing_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> impl Future<Output = LecternResult<Vec<Uuid>>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    fn list_for_group(
        &self,
        group_id: Uuid,
    ) -> impl Future<Output = LecternResult<Vec<Membership>>> + Send;
    fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LecternResult<Vec<Membership>>> + Send;
    fn find(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = LecternResult<Option<Membership>>> + Send;

    /// Apply a reconciliation delta to one group: removals, then role
    /// updates, then insertions, plus the group's audit-field touch,
    /// all in one transaction.
    fn apply_delta(
        &self,
        group_id: Uuid,
        delta: MembershipDelta,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<()>> + Send;

    /// Apply a user-axis delta: remove the user from `remove_groups`
    /// and add them (as Member) to `add_groups`, in one transaction.
    fn apply_user_delta(
        &self,
        user_id: Uuid,
        remove_groups: Vec<Uuid>,
        add_groups: Vec<Uuid>,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

pub trait GrantRepository: Send + Sync {
    fn find(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_id: Uuid,
    ) -> impl Future<Output = LecternResult<Option<AccessGrant>>> + Send;
    fn list_for_resource(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
    ) -> impl Future<Output = LecternResult<Vec<AccessGrant>>> + Send;

    /// Upsert one grant per subject in a single atomic batch: existing
    /// (resource, subject) rows get capability/expiry overwritten in
    /// place, new rows record `actor` as grantor. Returns the resulting
    /// grants in `subject_ids` order.
    fn upsert_many(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_ids: Vec<Uuid>,
        capability: Capability,
        expires_at: Option<DateTime<Utc>>,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<Vec<AccessGrant>>> + Send;

    /// Delete the grant row for the pair. Deleting a non-existent grant
    /// is `NotFound`, not a silent success.
    fn delete(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_id: Uuid,
    ) -> impl Future<Output = LecternResult<()>> + Send;

    /// Resource ids of this kind for which the subject currently holds
    /// an unexpired grant (expiry evaluated in the query, at read
    /// time).
    fn active_resource_ids_for_subject(
        &self,
        kind: ResourceKind,
        subject_id: Uuid,
    ) -> impl Future<Output = LecternResult<Vec<Uuid>>> + Send;
}

/// Narrow "does resource Y exist, and what is its access snapshot"
/// lookup used by the grant ledger and the resolver wrapper.
pub trait ResourceCatalog: Send + Sync {
    fn find_view(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> impl Future<Output = LecternResult<ResourceView>> + Send;
}

// ---------------------------------------------------------------------------
// Lectures & files
// ---------------------------------------------------------------------------

pub trait LectureRepository: Send + Sync {
    fn create(
        &self,
        input: CreateLecture,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<Lecture>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LecternResult<Lecture>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateLecture,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<Lecture>> + Send;
    fn soft_delete(&self, id: Uuid, actor: Uuid) -> impl Future<Output = LecternResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = LecternResult<PaginatedResult<Lecture>>> + Send;
    fn list_owned_by(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LecternResult<Vec<Lecture>>> + Send;
    fn list_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> impl Future<Output = LecternResult<Vec<Lecture>>> + Send;
}

pub trait FileRepository: Send + Sync {
    fn create(
        &self,
        input: CreateFile,
        actor: Uuid,
    ) -> impl Future<Output = LecternResult<StoredFile>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LecternResult<StoredFile>> + Send;
    fn get_by_filename(
        &self,
        filename: &str,
    ) -> impl Future<Output = LecternResult<StoredFile>> + Send;
    /// Hard-delete the file row and its grant rows in one transaction.
    fn delete(&self, id: Uuid) -> impl Future<Output = LecternResult<()>> + Send;
    fn list_owned_by(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LecternResult<Vec<StoredFile>>> + Send;
    fn list_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> impl Future<Output = LecternResult<Vec<StoredFile>>> + Send;
}
