//! Access-layer error types and denial messages.
//!
//! The denial constants feed the authorization gate, which wraps them
//! in `LecternError::Forbidden`; batch-resolution failures go through
//! [`AccessError`].

use lectern_core::error::LecternError;
use thiserror::Error;

pub const GROUP_UPDATE_DENIED: &str = "you may not update this group";
pub const GROUP_DELETE_DENIED: &str = "you may not delete this group";
pub const ADD_MEMBER_DENIED: &str = "you may not add members to this group";
pub const REMOVE_MEMBER_DENIED: &str = "you may not remove members from this group";
pub const RECONCILE_DENIED: &str = "you may not change the members of this group";
pub const ROLE_CHANGE_DENIED: &str =
    "only a group leader, the owner, or an admin may change member roles";
pub const USER_GROUPS_DENIED: &str = "only an admin may reassign a user's groups";
pub const GRANT_DENIED: &str = "you may not manage access to this resource";
pub const GRANT_LIST_DENIED: &str = "you may not view the access list of this resource";
pub const FILE_DELETE_DENIED: &str = "you may not delete this file";
pub const LECTURE_MODIFY_DENIED: &str = "you may not modify this lecture";

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("some users do not exist")]
    UsersMissing,

    #[error("some groups do not exist")]
    GroupsMissing,
}

impl From<AccessError> for LecternError {
    fn from(err: AccessError) -> Self {
        LecternError::Validation {
            message: err.to_string(),
        }
    }
}
