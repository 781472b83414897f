//! SurrealDB implementation of [`ResourceCatalog`].
//!
//! The narrow "does resource Y exist, who owns it, what is its default
//! policy" lookup consumed by the grant ledger and the resolver
//! wrapper.

use lectern_core::error::LecternResult;
use lectern_core::models::resource::{ResourceKind, ResourceView};
use lectern_core::repository::ResourceCatalog;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::convert::{parse_uuid, parse_visibility};

#[derive(Debug, SurrealValue)]
struct LectureOwnerRow {
    created_by: String,
}

#[derive(Debug, SurrealValue)]
struct FileOwnerRow {
    uploaded_by: String,
    visibility: String,
}

/// SurrealDB implementation of the resource catalog.
#[derive(Clone)]
pub struct SurrealResourceCatalog<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceCatalog<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ResourceCatalog for SurrealResourceCatalog<C> {
    async fn find_view(&self, kind: ResourceKind, id: Uuid) -> LecternResult<ResourceView> {
        let id_str = id.to_string();

        match kind {
            ResourceKind::Lecture => {
                let mut result = self
                    .db
                    .query(
                        "SELECT created_by FROM type::record('lecture', $id) \
                         WHERE status = 'Active'",
                    )
                    .bind(("id", id_str.clone()))
                    .await
                    .map_err(DbError::from)?;

                let rows: Vec<LectureOwnerRow> = result.take(0).map_err(DbError::from)?;
                let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                    entity: "lecture".into(),
                    id: id_str,
                })?;

                Ok(ResourceView {
                    kind,
                    id,
                    owner_id: parse_uuid(&row.created_by, "owner")?,
                    visibility: None,
                })
            }
            ResourceKind::File => {
                let mut result = self
                    .db
                    .query("SELECT uploaded_by, visibility FROM type::record('file', $id)")
                    .bind(("id", id_str.clone()))
                    .await
                    .map_err(DbError::from)?;

                let rows: Vec<FileOwnerRow> = result.take(0).map_err(DbError::from)?;
                let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                    entity: "file".into(),
                    id: id_str,
                })?;

                Ok(ResourceView {
                    kind,
                    id,
                    owner_id: parse_uuid(&row.uploaded_by, "owner")?,
                    visibility: Some(parse_visibility(&row.visibility)?),
                })
            }
        }
    }
}
