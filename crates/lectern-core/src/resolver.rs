//! Access resolver — the pure allow/deny decision for protected reads.
//!
//! The decision order is load-bearing: admin and owner bypass the grant
//! lookup entirely (revoking a grant can never lock out the owner), and
//! an expired grant is indistinguishable from no grant at read time.
//! Expiry is computed at decision time only; there is no background
//! sweep.

use chrono::{DateTime, Utc};

use crate::identity::Identity;
use crate::models::grant::{AccessGrant, Capability};
use crate::models::resource::{ResourceView, Visibility};

/// Tiers that need no grant lookup. Returns `Some(decision)` when the
/// outcome is already settled, `None` when the grant ledger must be
/// consulted (Restricted visibility, or a resource kind with no
/// visibility concept).
pub fn decide_before_grant(
    resource: &ResourceView,
    requester: &Identity,
    required: Capability,
) -> Option<bool> {
    if requester.is_admin() {
        return Some(true);
    }
    if resource.owner_id == requester.user_id {
        return Some(true);
    }
    match resource.visibility {
        Some(Visibility::Public) => Some(required == Capability::View),
        Some(Visibility::Private) => Some(false),
        Some(Visibility::Restricted) | None => None,
    }
}

/// The grant-gated tier: absent or expired grants deny; otherwise the
/// granted capability must satisfy the required one under the total
/// order `View < Download < Full`.
pub fn decide_with_grant(
    grant: Option<&AccessGrant>,
    required: Capability,
    now: DateTime<Utc>,
) -> bool {
    match grant {
        Some(g) if !g.is_expired(now) => g.capability.allows(required),
        _ => false,
    }
}

/// Full decision over an already-fetched grant. Safe to call on every
/// read; no side effects.
pub fn can_access(
    resource: &ResourceView,
    requester: &Identity,
    required: Capability,
    grant: Option<&AccessGrant>,
    now: DateTime<Utc>,
) -> bool {
    decide_before_grant(resource, requester, required)
        .unwrap_or_else(|| decide_with_grant(grant, required, now))
}
