//! SurrealDB implementation of [`GrantRepository`].
//!
//! Upserts follow the read-then-write discipline: existing
//! (resource, subject) rows are updated in place by record id, new
//! rows are created, and the whole batch commits as one transaction.
//! A concurrent insert racing to the same pair is rejected by the
//! unique (resource_kind, resource_id, subject_id) index, aborting the
//! transaction.

use chrono::{DateTime, Utc};
use lectern_core::error::LecternResult;
use lectern_core::models::grant::{AccessGrant, Capability};
use lectern_core::models::resource::ResourceKind;
use lectern_core::repository::GrantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::convert::{
    capability_to_str, parse_capability, parse_resource_kind, parse_uuid, resource_kind_to_str,
};

#[derive(Debug, SurrealValue)]
struct GrantRowWithId {
    record_id: String,
    resource_kind: String,
    resource_id: String,
    subject_id: String,
    capability: String,
    granted_by: String,
    expires_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GrantRowWithId {
    fn try_into_grant(self) -> Result<AccessGrant, DbError> {
        Ok(AccessGrant {
            id: parse_uuid(&self.record_id, "grant")?,
            resource_kind: parse_resource_kind(&self.resource_kind)?,
            resource_id: parse_uuid(&self.resource_id, "resource")?,
            subject_id: parse_uuid(&self.subject_id, "subject")?,
            capability: parse_capability(&self.capability)?,
            granted_by: parse_uuid(&self.granted_by, "grantor")?,
            expires_at: self.expires_at,
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

const SELECT_GRANT: &str = "SELECT meta::id(id) AS record_id, * FROM access_grant \
     WHERE resource_kind = $kind AND resource_id = $resource_id";

/// SurrealDB implementation of the Grant repository.
#[derive(Clone)]
pub struct SurrealGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Existing grant record ids for the given subjects, keyed by
    /// subject id string.
    async fn existing_grant_ids(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_ids: &[Uuid],
    ) -> Result<Vec<(String, String)>, DbError> {
        #[derive(Debug, SurrealValue)]
        struct IdRow {
            record_id: String,
            subject_id: String,
        }

        let subjects: Vec<String> = subject_ids.iter().map(Uuid::to_string).collect();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, subject_id \
                 FROM access_grant \
                 WHERE resource_kind = $kind \
                 AND resource_id = $resource_id \
                 AND subject_id IN $subjects",
            )
            .bind(("kind", resource_kind_to_str(kind)))
            .bind(("resource_id", resource_id.to_string()))
            .bind(("subjects", subjects))
            .await?;

        let rows: Vec<IdRow> = result.take(0)?;
        Ok(rows
            .into_iter()
            .map(|r| (r.subject_id, r.record_id))
            .collect())
    }
}

impl<C: Connection> GrantRepository for SurrealGrantRepository<C> {
    async fn find(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_id: Uuid,
    ) -> LecternResult<Option<AccessGrant>> {
        let query = format!("{SELECT_GRANT} AND subject_id = $subject_id");
        let mut result = self
            .db
            .query(&query)
            .bind(("kind", resource_kind_to_str(kind)))
            .bind(("resource_id", resource_id.to_string()))
            .bind(("subject_id", subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_grant().map_err(Into::into))
            .transpose()
    }

    async fn list_for_resource(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
    ) -> LecternResult<Vec<AccessGrant>> {
        let query = format!("{SELECT_GRANT} ORDER BY created_at DESC");
        let mut result = self
            .db
            .query(&query)
            .bind(("kind", resource_kind_to_str(kind)))
            .bind(("resource_id", resource_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_grant().map_err(Into::into))
            .collect()
    }

    async fn upsert_many(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_ids: Vec<Uuid>,
        capability: Capability,
        expires_at: Option<DateTime<Utc>>,
        actor: Uuid,
    ) -> LecternResult<Vec<AccessGrant>> {
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }

        let existing = self
            .existing_grant_ids(kind, resource_id, &subject_ids)
            .await?;

        let mut statements: Vec<String> = vec!["BEGIN TRANSACTION".into()];
        let mut builder_binds: Vec<(String, String)> = vec![
            ("kind".into(), resource_kind_to_str(kind).into()),
            ("resource_id".into(), resource_id.to_string()),
            ("capability".into(), capability_to_str(capability).into()),
            ("actor".into(), actor.to_string()),
        ];

        for (i, subject_id) in subject_ids.iter().enumerate() {
            let subject_str = subject_id.to_string();
            match existing.iter().find(|(s, _)| *s == subject_str) {
                Some((_, record_id)) => {
                    // Overwrite capability and expiry in place; the
                    // original grantor stays on the row.
                    statements.push(format!(
                        "UPDATE type::record('access_grant', $rec_{i}) SET \
                         capability = $capability, expires_at = $expires_at, \
                         updated_by = $actor, updated_at = time::now()"
                    ));
                    builder_binds.push((format!("rec_{i}"), record_id.clone()));
                }
                None => {
                    statements.push(format!(
                        "CREATE type::record('access_grant', $new_{i}) SET \
                         resource_kind = $kind, resource_id = $resource_id, \
                         subject_id = $subj_{i}, capability = $capability, \
                         expires_at = $expires_at, granted_by = $actor"
                    ));
                    builder_binds.push((format!("new_{i}"), Uuid::new_v4().to_string()));
                    builder_binds.push((format!("subj_{i}"), subject_str));
                }
            }
        }

        statements.push("COMMIT TRANSACTION".into());
        let script = format!("{};", statements.join("; "));

        let mut builder = self.db.query(&script).bind(("expires_at", expires_at));
        for (key, value) in builder_binds {
            builder = builder.bind((key, value));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        // Read the committed rows back in subject order.
        let mut grants = Vec::with_capacity(subject_ids.len());
        for subject_id in &subject_ids {
            let grant = self.find(kind, resource_id, *subject_id).await?.ok_or_else(|| {
                DbError::NotFound {
                    entity: "access grant".into(),
                    id: subject_id.to_string(),
                }
            })?;
            grants.push(grant);
        }
        Ok(grants)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        subject_id: Uuid,
    ) -> LecternResult<()> {
        let mut result = self
            .db
            .query(
                "DELETE access_grant \
                 WHERE resource_kind = $kind \
                 AND resource_id = $resource_id \
                 AND subject_id = $subject_id \
                 RETURN BEFORE",
            )
            .bind(("kind", resource_kind_to_str(kind)))
            .bind(("resource_id", resource_id.to_string()))
            .bind(("subject_id", subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        #[derive(Debug, SurrealValue)]
        struct DeletedRow {
            #[allow(dead_code)]
            subject_id: String,
        }

        let deleted: Vec<DeletedRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::NotFound {
                entity: "access grant".into(),
                id: format!("{resource_id}/{subject_id}"),
            }
            .into());
        }

        Ok(())
    }

    async fn active_resource_ids_for_subject(
        &self,
        kind: ResourceKind,
        subject_id: Uuid,
    ) -> LecternResult<Vec<Uuid>> {
        // Expiry is evaluated here, at read time; expired rows simply
        // drop out of the result.
        let mut result = self
            .db
            .query(
                "SELECT VALUE resource_id FROM access_grant \
                 WHERE resource_kind = $kind \
                 AND subject_id = $subject_id \
                 AND (expires_at IS NONE OR expires_at > time::now())",
            )
            .bind(("kind", resource_kind_to_str(kind)))
            .bind(("subject_id", subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        ids.iter()
            .map(|s| parse_uuid(s, "resource").map_err(Into::into))
            .collect()
    }
}
