//! Lectern Access — membership reconciliation, the permission-grant
//! ledger, and access resolution.
//!
//! Services here are generic over the `lectern-core` repository traits
//! so this crate has no dependency on the database crate. Every
//! mutating operation runs the authorization gate first, validates its
//! inputs, and then hands the storage layer a single atomic change
//! set.

pub mod content;
pub mod error;
pub mod groups;
pub mod ledger;
pub mod reconcile;

pub use content::{FileService, LectureService};
pub use error::AccessError;
pub use groups::GroupService;
pub use ledger::GrantService;
pub use reconcile::MembershipService;
