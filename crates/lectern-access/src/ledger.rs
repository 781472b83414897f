//! Permission grant ledger and the access-resolution entry point.
//!
//! Grants are the 1-dimensional sibling of membership reconciliation:
//! one capability per (resource, subject) pair, upserted in place,
//! revocable, optionally expiring. The ledger never decides access by
//! itself — [`GrantService::can_access`] defers to the pure resolver
//! in `lectern-core`, fetching the grant row only when the decision
//! actually needs it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use lectern_core::error::{LecternError, LecternResult};
use lectern_core::gate;
use lectern_core::identity::Identity;
use lectern_core::models::grant::{AccessGrant, Capability};
use lectern_core::models::resource::ResourceKind;
use lectern_core::repository::{GrantRepository, ResourceCatalog, UserRepository};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AccessError, GRANT_DENIED, GRANT_LIST_DENIED};

/// Permission grant service.
pub struct GrantService<C, U, R>
where
    C: ResourceCatalog,
    U: UserRepository,
    R: GrantRepository,
{
    catalog: C,
    users: U,
    grants: R,
}

impl<C, U, R> GrantService<C, U, R>
where
    C: ResourceCatalog,
    U: UserRepository,
    R: GrantRepository,
{
    pub fn new(catalog: C, users: U, grants: R) -> Self {
        Self {
            catalog,
            users,
            grants,
        }
    }

    /// Grant (or re-grant) a capability to one subject.
    ///
    /// An existing grant for the pair has its capability and expiry
    /// overwritten in place; the stored grantor is preserved.
    pub async fn grant(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_id: Uuid,
        capability: Capability,
        expires_at: Option<DateTime<Utc>>,
        actor: &Identity,
    ) -> LecternResult<AccessGrant> {
        let view = self.catalog.find_view(kind, resource_id).await?;
        gate::require_owner_or_admin(view.owner_id, actor, GRANT_DENIED)?;
        self.users.get_by_id(subject_id).await?;

        debug!(
            resource = %resource_id,
            subject = %subject_id,
            ?capability,
            "granting access"
        );
        let mut grants = self
            .grants
            .upsert_many(
                kind,
                resource_id,
                vec![subject_id],
                capability,
                expires_at,
                actor.user_id,
            )
            .await?;
        grants
            .pop()
            .ok_or_else(|| LecternError::Internal("upsert returned no grant".into()))
    }

    /// Grant a capability to many subjects as one atomic batch: if any
    /// subject id is unknown, zero grants are written.
    pub async fn grant_many(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_ids: Vec<Uuid>,
        capability: Capability,
        expires_at: Option<DateTime<Utc>>,
        actor: &Identity,
    ) -> LecternResult<Vec<AccessGrant>> {
        let view = self.catalog.find_view(kind, resource_id).await?;
        gate::require_owner_or_admin(view.owner_id, actor, GRANT_DENIED)?;

        // Dedup while keeping order; the unique pair index would reject
        // a batch carrying the same subject twice.
        let mut seen = HashSet::new();
        let subjects: Vec<Uuid> = subject_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        let found = self.users.existing_ids(subjects.clone()).await?;
        if found.len() != subjects.len() {
            return Err(AccessError::UsersMissing.into());
        }

        self.grants
            .upsert_many(kind, resource_id, subjects, capability, expires_at, actor.user_id)
            .await
    }

    /// Revoke a grant. Revoking a pair that holds no grant is
    /// `NotFound`, distinguishing "nothing to revoke" from an explicit
    /// revocation for audit purposes.
    pub async fn revoke(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_id: Uuid,
        actor: &Identity,
    ) -> LecternResult<()> {
        let view = self.catalog.find_view(kind, resource_id).await?;
        gate::require_owner_or_admin(view.owner_id, actor, GRANT_DENIED)?;

        debug!(resource = %resource_id, subject = %subject_id, "revoking access");
        self.grants.delete(kind, resource_id, subject_id).await
    }

    /// All grants on a resource; owner-or-admin only.
    pub async fn grants_for_resource(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        actor: &Identity,
    ) -> LecternResult<Vec<AccessGrant>> {
        let view = self.catalog.find_view(kind, resource_id).await?;
        gate::require_owner_or_admin(view.owner_id, actor, GRANT_LIST_DENIED)?;
        self.grants.list_for_resource(kind, resource_id).await
    }

    /// The grant held by one subject on a resource, if any. No gate:
    /// subjects may inspect their own standing, and the resolver path
    /// goes through [`Self::can_access`].
    pub async fn grant_for(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_id: Uuid,
    ) -> LecternResult<Option<AccessGrant>> {
        self.grants.find(kind, resource_id, subject_id).await
    }

    /// Decide whether `requester` may exercise `required` on the
    /// resource. Admin, owner and the visibility tiers settle without
    /// touching the ledger; only the gated path fetches the grant row.
    pub async fn can_access(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        requester: &Identity,
        required: Capability,
    ) -> LecternResult<bool> {
        let view = self.catalog.find_view(kind, resource_id).await?;

        if let Some(decision) = lectern_core::resolver::decide_before_grant(&view, requester, required)
        {
            return Ok(decision);
        }

        let grant = self
            .grants
            .find(kind, resource_id, requester.user_id)
            .await?;
        Ok(lectern_core::resolver::decide_with_grant(
            grant.as_ref(),
            required,
            Utc::now(),
        ))
    }
}
