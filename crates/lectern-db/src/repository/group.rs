//! SurrealDB implementation of [`GroupRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lectern_core::error::LecternResult;
use lectern_core::models::group::{CreateGroup, Group, GroupWithMemberCount, UpdateGroup};
use lectern_core::repository::{GroupRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::convert::{parse_status, parse_uuid};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GroupRow {
    code: i64,
    name: String,
    status: String,
    created_by: String,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn try_into_group(self, id: Uuid) -> Result<Group, DbError> {
        Ok(Group {
            id,
            code: self.code,
            name: self.name,
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

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct GroupRowWithId {
    record_id: String,
    code: i64,
    name: String,
    status: String,
    created_by: String,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRowWithId {
    fn try_into_group(self) -> Result<Group, DbError> {
        let id = parse_uuid(&self.record_id, "group")?;
        Ok(Group {
            id,
            code: self.code,
            name: self.name,
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

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Row struct for per-group member-count aggregation.
#[derive(Debug, SurrealValue)]
struct MemberCountRow {
    group_id: String,
    total: u64,
}

/// SurrealDB implementation of the Group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn next_code(&self) -> Result<i64, DbError> {
        let mut result = self
            .db
            .query("SELECT VALUE code FROM group ORDER BY code DESC LIMIT 1")
            .await?;
        let codes: Vec<i64> = result.take(0)?;
        Ok(codes.into_iter().next().unwrap_or(0) + 1)
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup, actor: Uuid) -> LecternResult<Group> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        // A concurrent create racing to the same code is rejected by
        // the unique index on `code`; the caller retries.
        let code = self.next_code().await?;

        let result = self
            .db
            .query(
                "CREATE type::record('group', $id) SET \
                 code = $code, name = $name, status = 'Active', \
                 created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("code", code))
            .bind(("name", input.name))
            .bind(("created_by", actor.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.try_into_group(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> LecternResult<Group> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('group', $id) \
                 WHERE status = 'Active'",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.try_into_group(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateGroup, actor: Uuid) -> LecternResult<Group> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        sets.push("updated_by = $actor");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('group', $id) SET {} \
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

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.try_into_group(id)?)
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> LecternResult<()> {
        // Membership cascade and the status flip commit together.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE membership WHERE group_id = $id; \
                 UPDATE type::record('group', $id) SET \
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

    async fn list(&self, pagination: Pagination) -> LecternResult<PaginatedResult<Group>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM group \
                 WHERE status = 'Active' GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE status = 'Active' \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_with_member_count(&self) -> LecternResult<Vec<GroupWithMemberCount>> {
        let mut groups_result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE status = 'Active' \
                 ORDER BY created_at DESC",
            )
            .await
            .map_err(DbError::from)?;
        let rows: Vec<GroupRowWithId> = groups_result.take(0).map_err(DbError::from)?;

        let mut counts_result = self
            .db
            .query(
                "SELECT group_id, count() AS total FROM membership \
                 GROUP BY group_id",
            )
            .await
            .map_err(DbError::from)?;
        let counts: Vec<MemberCountRow> = counts_result.take(0).map_err(DbError::from)?;
        let by_group: HashMap<String, u64> =
            counts.into_iter().map(|c| (c.group_id, c.total)).collect();

        rows.into_iter()
            .map(|row| {
                let count = by_group.get(&row.record_id).copied().unwrap_or(0);
                let group = row.try_into_group()?;
                Ok(GroupWithMemberCount {
                    id: group.id,
                    code: group.code,
                    name: group.name,
                    member_count: count,
                    created_at: group.created_at,
                    updated_at: group.updated_at,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn search_by_name(&self, keyword: &str) -> LecternResult<Vec<Group>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE status = 'Active' \
                 AND string::lowercase(name) CONTAINS string::lowercase($keyword) \
                 ORDER BY name ASC",
            )
            .bind(("keyword", keyword.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_group().map_err(Into::into))
            .collect()
    }

    async fn max_code(&self) -> LecternResult<i64> {
        Ok(self.next_code().await? - 1)
    }

    async fn existing_ids(&self, ids: Vec<Uuid>) -> LecternResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM group \
                 WHERE status = 'Active' AND meta::id(id) IN $ids",
            )
            .bind(("ids", id_strs))
            .await
            .map_err(DbError::from)?;

        let found: Vec<String> = result.take(0).map_err(DbError::from)?;
        found
            .iter()
            .map(|s| parse_uuid(s, "group").map_err(Into::into))
            .collect()
    }
}
