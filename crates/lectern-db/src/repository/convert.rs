//! String <-> enum conversions for ASSERT-constrained columns.
//!
//! The canonical strings here must match the ASSERT lists in
//! `schema.rs` exactly.

use lectern_core::identity::UserType;
use lectern_core::models::file::FileKind;
use lectern_core::models::grant::Capability;
use lectern_core::models::membership::GroupRole;
use lectern_core::models::resource::{ResourceKind, Visibility};
use lectern_core::models::status::EntityStatus;
use uuid::Uuid;

use crate::error::DbError;

pub(crate) fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Migration(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn user_type_to_str(value: UserType) -> &'static str {
    match value {
        UserType::Admin => "Admin",
        UserType::Regular => "Regular",
    }
}

pub(crate) fn parse_user_type(s: &str) -> Result<UserType, DbError> {
    match s {
        "Admin" => Ok(UserType::Admin),
        "Regular" => Ok(UserType::Regular),
        other => Err(DbError::Migration(format!("unknown user type: {other}"))),
    }
}

pub(crate) fn status_to_str(value: EntityStatus) -> &'static str {
    match value {
        EntityStatus::Active => "Active",
        EntityStatus::Deleted => "Deleted",
    }
}

pub(crate) fn parse_status(s: &str) -> Result<EntityStatus, DbError> {
    match s {
        "Active" => Ok(EntityStatus::Active),
        "Deleted" => Ok(EntityStatus::Deleted),
        other => Err(DbError::Migration(format!("unknown status: {other}"))),
    }
}

pub(crate) fn role_to_str(value: GroupRole) -> &'static str {
    match value {
        GroupRole::Member => "Member",
        GroupRole::Leader => "Leader",
    }
}

pub(crate) fn parse_role(s: &str) -> Result<GroupRole, DbError> {
    match s {
        "Member" => Ok(GroupRole::Member),
        "Leader" => Ok(GroupRole::Leader),
        other => Err(DbError::Migration(format!("unknown group role: {other}"))),
    }
}

pub(crate) fn capability_to_str(value: Capability) -> &'static str {
    match value {
        Capability::View => "View",
        Capability::Download => "Download",
        Capability::Full => "Full",
    }
}

pub(crate) fn parse_capability(s: &str) -> Result<Capability, DbError> {
    match s {
        "View" => Ok(Capability::View),
        "Download" => Ok(Capability::Download),
        "Full" => Ok(Capability::Full),
        other => Err(DbError::Migration(format!("unknown capability: {other}"))),
    }
}

pub(crate) fn resource_kind_to_str(value: ResourceKind) -> &'static str {
    match value {
        ResourceKind::Lecture => "Lecture",
        ResourceKind::File => "File",
    }
}

pub(crate) fn parse_resource_kind(s: &str) -> Result<ResourceKind, DbError> {
    match s {
        "Lecture" => Ok(ResourceKind::Lecture),
        "File" => Ok(ResourceKind::File),
        other => Err(DbError::Migration(format!("unknown resource kind: {other}"))),
    }
}

pub(crate) fn visibility_to_str(value: Visibility) -> &'static str {
    match value {
        Visibility::Public => "Public",
        Visibility::Private => "Private",
        Visibility::Restricted => "Restricted",
    }
}

pub(crate) fn parse_visibility(s: &str) -> Result<Visibility, DbError> {
    match s {
        "Public" => Ok(Visibility::Public),
        "Private" => Ok(Visibility::Private),
        "Restricted" => Ok(Visibility::Restricted),
        other => Err(DbError::Migration(format!("unknown visibility: {other}"))),
    }
}

pub(crate) fn file_kind_to_str(value: FileKind) -> &'static str {
    match value {
        FileKind::Normal => "Normal",
        FileKind::Config => "Config",
    }
}

pub(crate) fn parse_file_kind(s: &str) -> Result<FileKind, DbError> {
    match s {
        "Normal" => Ok(FileKind::Normal),
        "Config" => Ok(FileKind::Config),
        other => Err(DbError::Migration(format!("unknown file kind: {other}"))),
    }
}
