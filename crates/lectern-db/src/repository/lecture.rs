//! SurrealDB implementation of [`LectureRepository`].

use chrono::{DateTime, Utc};
use lectern_core::error::LecternResult;
use lectern_core::models::lecture::{CreateLecture, Lecture, UpdateLecture};
use lectern_core::repository::{LectureRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::convert::{parse_status, parse_uuid};

#[derive(Debug, SurrealValue)]
struct LectureRow {
    name: String,
    description: String,
    status: String,
    created_by: String,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LectureRow {
    fn try_into_lecture(self, id: Uuid) -> Result<Lecture, DbError> {
        Ok(Lecture {
            id,
            name: self.name,
            description: self.description,
            status: parse_status(&self.status)?,
            created_by: parse_uuid(&self.created_by, "owner")?,
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
struct LectureRowWithId {
    record_id: String,
    name: String,
    description: String,
    status: String,
    created_by: String,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LectureRowWithId {
    fn try_into_lecture(self) -> Result<Lecture, DbError> {
        let id = parse_uuid(&self.record_id, "lecture")?;
        LectureRow {
            name: self.name,
            description: self.description,
            status: self.status,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_lecture(id)
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Lecture repository.
#[derive(Clone)]
pub struct SurrealLectureRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLectureRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> LectureRepository for SurrealLectureRepository<C> {
    async fn create(&self, input: CreateLecture, actor: Uuid) -> LecternResult<Lecture> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('lecture', $id) SET \
                 name = $name, description = $description, \
                 status = 'Active', created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("created_by", actor.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<LectureRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lecture".into(),
            id: id_str,
        })?;

        Ok(row.try_into_lecture(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> LecternResult<Lecture> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('lecture', $id) \
                 WHERE status = 'Active'",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LectureRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lecture".into(),
            id: id_str,
        })?;

        Ok(row.try_into_lecture(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateLecture, actor: Uuid) -> LecternResult<Lecture> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_by = $actor");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('lecture', $id) SET {} \
             WHERE status = 'Active'",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("actor", actor.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<LectureRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lecture".into(),
            id: id_str,
        })?;

        Ok(row.try_into_lecture(id)?)
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> LecternResult<()> {
        // Grant rows cascade with the status flip.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE access_grant WHERE resource_kind = 'Lecture' \
                 AND resource_id = $id; \
                 UPDATE type::record('lecture', $id) SET \
                 status = 'Deleted', updated_by = $actor, \
                 updated_at = time::now(); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("actor", actor.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> LecternResult<PaginatedResult<Lecture>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM lecture \
                 WHERE status = 'Active' GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM lecture \
                 WHERE status = 'Active' \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LectureRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_lecture())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_owned_by(&self, user_id: Uuid) -> LecternResult<Vec<Lecture>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM lecture \
                 WHERE status = 'Active' AND created_by = $user_id \
                 ORDER BY created_at DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LectureRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_lecture().map_err(Into::into))
            .collect()
    }

    async fn list_by_ids(&self, ids: Vec<Uuid>) -> LecternResult<Vec<Lecture>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM lecture \
                 WHERE status = 'Active' AND meta::id(id) IN $ids \
                 ORDER BY created_at DESC",
            )
            .bind(("ids", id_strs))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LectureRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_lecture().map_err(Into::into))
            .collect()
    }
}
