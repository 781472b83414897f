//! SurrealDB implementation of [`MembershipRepository`].
//!
//! Delta application builds one multi-statement script wrapped in
//! `BEGIN TRANSACTION` / `COMMIT TRANSACTION`: removals, then in-place
//! role updates, then insertions, then the owning group's audit touch.
//! A failure anywhere (including a unique-index violation on the
//! (group_id, user_id) pair) rolls the whole script back.

use chrono::{DateTime, Utc};
use lectern_core::error::LecternResult;
use lectern_core::models::membership::{Membership, MembershipDelta};
use lectern_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::convert::{parse_role, parse_uuid, role_to_str};

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    group_id: String,
    user_id: String,
    role: String,
    created_by: Option<String>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        Ok(Membership {
            group_id: parse_uuid(&self.group_id, "group")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            role: parse_role(&self.role)?,
            created_by: self
                .created_by
                .as_deref()
                .map(|s| parse_uuid(s, "creator"))
                .transpose()?,
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

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn list_for_group(&self, group_id: Uuid) -> LecternResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership WHERE group_id = $group_id \
                 ORDER BY created_at ASC",
            )
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_membership().map_err(Into::into))
            .collect()
    }

    async fn list_for_user(&self, user_id: Uuid) -> LecternResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership WHERE user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_membership().map_err(Into::into))
            .collect()
    }

    async fn find(&self, group_id: Uuid, user_id: Uuid) -> LecternResult<Option<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership \
                 WHERE group_id = $group_id AND user_id = $user_id",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_membership().map_err(Into::into))
            .transpose()
    }

    async fn apply_delta(
        &self,
        group_id: Uuid,
        delta: MembershipDelta,
        actor: Uuid,
    ) -> LecternResult<()> {
        if delta.is_empty() {
            return Ok(());
        }

        let mut statements: Vec<String> = vec!["BEGIN TRANSACTION".into()];
        let mut builder_binds: Vec<(String, String)> = vec![
            ("group_id".into(), group_id.to_string()),
            ("actor".into(), actor.to_string()),
        ];

        if !delta.to_remove.is_empty() {
            statements.push(
                "DELETE membership WHERE group_id = $group_id \
                 AND user_id IN $remove_ids"
                    .into(),
            );
        }

        for (i, spec) in delta.to_update.iter().enumerate() {
            statements.push(format!(
                "UPDATE membership SET role = $up_role_{i}, \
                 updated_by = $actor, updated_at = time::now() \
                 WHERE group_id = $group_id AND user_id = $up_user_{i}"
            ));
            builder_binds.push((format!("up_role_{i}"), role_to_str(spec.role).into()));
            builder_binds.push((format!("up_user_{i}"), spec.user_id.to_string()));
        }

        for (i, spec) in delta.to_add.iter().enumerate() {
            statements.push(format!(
                "CREATE type::record('membership', $add_id_{i}) SET \
                 group_id = $group_id, user_id = $add_user_{i}, \
                 role = $add_role_{i}, created_by = $actor"
            ));
            builder_binds.push((format!("add_id_{i}"), Uuid::new_v4().to_string()));
            builder_binds.push((format!("add_user_{i}"), spec.user_id.to_string()));
            builder_binds.push((format!("add_role_{i}"), role_to_str(spec.role).into()));
        }

        // Any membership change touches the group's audit fields in the
        // same transaction.
        statements.push(
            "UPDATE type::record('group', $group_id) SET \
             updated_by = $actor, updated_at = time::now()"
                .into(),
        );
        statements.push("COMMIT TRANSACTION".into());

        let script = format!("{};", statements.join("; "));

        let mut builder = self.db.query(&script);
        for (key, value) in builder_binds {
            builder = builder.bind((key, value));
        }
        if !delta.to_remove.is_empty() {
            let remove_ids: Vec<String> =
                delta.to_remove.iter().map(Uuid::to_string).collect();
            builder = builder.bind(("remove_ids", remove_ids));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(())
    }

    async fn apply_user_delta(
        &self,
        user_id: Uuid,
        remove_groups: Vec<Uuid>,
        add_groups: Vec<Uuid>,
        actor: Uuid,
    ) -> LecternResult<()> {
        if remove_groups.is_empty() && add_groups.is_empty() {
            return Ok(());
        }

        let mut statements: Vec<String> = vec!["BEGIN TRANSACTION".into()];
        let mut builder_binds: Vec<(String, String)> = vec![
            ("user_id".into(), user_id.to_string()),
            ("actor".into(), actor.to_string()),
        ];

        if !remove_groups.is_empty() {
            statements.push(
                "DELETE membership WHERE user_id = $user_id \
                 AND group_id IN $remove_groups"
                    .into(),
            );
        }

        for (i, group_id) in add_groups.iter().enumerate() {
            statements.push(format!(
                "CREATE type::record('membership', $add_id_{i}) SET \
                 group_id = $add_group_{i}, user_id = $user_id, \
                 role = 'Member', created_by = $actor"
            ));
            builder_binds.push((format!("add_id_{i}"), Uuid::new_v4().to_string()));
            builder_binds.push((format!("add_group_{i}"), group_id.to_string()));
        }

        statements.push("COMMIT TRANSACTION".into());
        let script = format!("{};", statements.join("; "));

        let mut builder = self.db.query(&script);
        for (key, value) in builder_binds {
            builder = builder.bind((key, value));
        }
        if !remove_groups.is_empty() {
            let remove_ids: Vec<String> =
                remove_groups.iter().map(Uuid::to_string).collect();
            builder = builder.bind(("remove_groups", remove_ids));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(())
    }
}
