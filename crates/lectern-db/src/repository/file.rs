//! SurrealDB implementation of [`FileRepository`].

use chrono::{DateTime, Utc};
use lectern_core::error::LecternResult;
use lectern_core::models::file::{CreateFile, StoredFile};
use lectern_core::repository::FileRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::convert::{
    file_kind_to_str, parse_file_kind, parse_uuid, parse_visibility, visibility_to_str,
};

#[derive(Debug, SurrealValue)]
struct FileRow {
    original_name: String,
    filename: String,
    path: String,
    mimetype: String,
    size: u64,
    kind: String,
    visibility: String,
    uploaded_by: String,
    description: Option<String>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FileRow {
    fn try_into_file(self, id: Uuid) -> Result<StoredFile, DbError> {
        Ok(StoredFile {
            id,
            original_name: self.original_name,
            filename: self.filename,
            path: self.path,
            mimetype: self.mimetype,
            size: self.size,
            kind: parse_file_kind(&self.kind)?,
            visibility: parse_visibility(&self.visibility)?,
            uploaded_by: parse_uuid(&self.uploaded_by, "owner")?,
            description: self.description,
            updated_by: self
                .updated_by
                .as_deref()
                .map(|s| parse_uuid(s, "updater"))
                .transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct FileRowWithId {
    record_id: String,
    original_name: String,
    filename: String,
    path: String,
    mimetype: String,
    size: u64,
    kind: String,
    visibility: String,
    uploaded_by: String,
    description: Option<String>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FileRowWithId {
    fn try_into_file(self) -> Result<StoredFile, DbError> {
        let id = parse_uuid(&self.record_id, "file")?;
        FileRow {
            original_name: self.original_name,
            filename: self.filename,
            path: self.path,
            mimetype: self.mimetype,
            size: self.size,
            kind: self.kind,
            visibility: self.visibility,
            uploaded_by: self.uploaded_by,
            description: self.description,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_file(id)
    }
}

/// SurrealDB implementation of the File repository.
#[derive(Clone)]
pub struct SurrealFileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FileRepository for SurrealFileRepository<C> {
    async fn create(&self, input: CreateFile, actor: Uuid) -> LecternResult<StoredFile> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('file', $id) SET \
                 original_name = $original_name, filename = $filename, \
                 path = $path, mimetype = $mimetype, size = $size, \
                 kind = $kind, visibility = $visibility, \
                 uploaded_by = $uploaded_by, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("original_name", input.original_name))
            .bind(("filename", input.filename))
            .bind(("path", input.path))
            .bind(("mimetype", input.mimetype))
            .bind(("size", input.size))
            .bind(("kind", file_kind_to_str(input.kind)))
            .bind(("visibility", visibility_to_str(input.visibility)))
            .bind(("uploaded_by", actor.to_string()))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<FileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "file".into(),
            id: id_str,
        })?;

        Ok(row.try_into_file(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> LecternResult<StoredFile> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('file', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "file".into(),
            id: id_str,
        })?;

        Ok(row.try_into_file(id)?)
    }

    async fn get_by_filename(&self, filename: &str) -> LecternResult<StoredFile> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM file \
                 WHERE filename = $filename",
            )
            .bind(("filename", filename.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FileRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "file".into(),
            id: filename.to_string(),
        })?;

        Ok(row.try_into_file()?)
    }

    async fn delete(&self, id: Uuid) -> LecternResult<()> {
        // The file row and its grant rows go together.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE access_grant WHERE resource_kind = 'File' \
                 AND resource_id = $id; \
                 DELETE type::record('file', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(())
    }

    async fn list_owned_by(&self, user_id: Uuid) -> LecternResult<Vec<StoredFile>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM file \
                 WHERE uploaded_by = $user_id \
                 ORDER BY created_at DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FileRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_file().map_err(Into::into))
            .collect()
    }

    async fn list_by_ids(&self, ids: Vec<Uuid>) -> LecternResult<Vec<StoredFile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM file \
                 WHERE meta::id(id) IN $ids \
                 ORDER BY created_at DESC",
            )
            .bind(("ids", id_strs))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FileRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_file().map_err(Into::into))
            .collect()
    }
}
