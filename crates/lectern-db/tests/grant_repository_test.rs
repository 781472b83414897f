//! Integration tests for the Grant repository: upsert-in-place
//! semantics, revoke-of-nothing, and read-time expiry filtering.

use chrono::{Duration, Utc};
use lectern_core::error::LecternError;
use lectern_core::identity::UserType;
use lectern_core::models::file::{CreateFile, FileKind};
use lectern_core::models::grant::Capability;
use lectern_core::models::resource::{ResourceKind, Visibility};
use lectern_core::models::user::CreateUser;
use lectern_core::repository::{FileRepository, GrantRepository, UserRepository};
use lectern_db::repository::{SurrealFileRepository, SurrealGrantRepository, SurrealUserRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: in-memory DB with one owner, one subject, one file.
async fn setup() -> (
    SurrealGrantRepository<surrealdb::engine::local::Db>,
    Uuid, // file_id
    Uuid, // owner_id
    Uuid, // subject_id
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    lectern_db::run_migrations(&db).await.unwrap();

    let user_repo = SurrealUserRepository::new(db.clone());
    let owner = user_repo
        .create(CreateUser {
            username: "owner".into(),
            full_name: "Owner".into(),
            email: "owner@example.com".into(),
            user_type: UserType::Regular,
        })
        .await
        .unwrap();
    let subject = user_repo
        .create(CreateUser {
            username: "subject".into(),
            full_name: "Subject".into(),
            email: "subject@example.com".into(),
            user_type: UserType::Regular,
        })
        .await
        .unwrap();

    let file_repo = SurrealFileRepository::new(db.clone());
    let file = file_repo
        .create(
            CreateFile {
                original_name: "notes.pdf".into(),
                filename: "a1b2c3.pdf".into(),
                path: "uploads/a1b2c3.pdf".into(),
                mimetype: "application/pdf".into(),
                size: 1024,
                kind: FileKind::Normal,
                visibility: Visibility::Restricted,
                description: None,
            },
            owner.id,
        )
        .await
        .unwrap();

    (
        SurrealGrantRepository::new(db),
        file.id,
        owner.id,
        subject.id,
    )
}

#[tokio::test]
async fn upsert_creates_then_overwrites_in_place() {
    let (repo, file_id, owner, subject) = setup().await;

    let first = repo
        .upsert_many(
            ResourceKind::File,
            file_id,
            vec![subject],
            Capability::View,
            None,
            owner,
        )
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].capability, Capability::View);
    assert_eq!(first[0].granted_by, owner);

    let expires = Utc::now() + Duration::days(7);
    let second = repo
        .upsert_many(
            ResourceKind::File,
            file_id,
            vec![subject],
            Capability::Download,
            Some(expires),
            subject, // a different actor updates
        )
        .await
        .unwrap();

    // Exactly one row, capability overwritten, original grantor kept.
    let all = repo
        .list_for_resource(ResourceKind::File, file_id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].capability, Capability::Download);
    assert_eq!(second[0].granted_by, owner);
    assert_eq!(second[0].updated_by, Some(subject));
    assert!(second[0].expires_at.is_some());
}

#[tokio::test]
async fn grants_to_the_same_resource_id_of_different_kinds_are_distinct() {
    let (repo, file_id, owner, subject) = setup().await;

    repo.upsert_many(
        ResourceKind::File,
        file_id,
        vec![subject],
        Capability::View,
        None,
        owner,
    )
    .await
    .unwrap();
    // The same (resource_id, subject) under a different kind is a
    // separate row; the pair key includes the kind.
    repo.upsert_many(
        ResourceKind::Lecture,
        file_id,
        vec![subject],
        Capability::View,
        None,
        owner,
    )
    .await
    .unwrap();

    let file_grants = repo
        .list_for_resource(ResourceKind::File, file_id)
        .await
        .unwrap();
    let lecture_grants = repo
        .list_for_resource(ResourceKind::Lecture, file_id)
        .await
        .unwrap();
    assert_eq!(file_grants.len(), 1);
    assert_eq!(lecture_grants.len(), 1);
}

#[tokio::test]
async fn find_returns_none_for_ungranted_pair() {
    let (repo, file_id, _, subject) = setup().await;

    let found = repo
        .find(ResourceKind::File, file_id, subject)
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn delete_removes_the_row() {
    let (repo, file_id, owner, subject) = setup().await;

    repo.upsert_many(
        ResourceKind::File,
        file_id,
        vec![subject],
        Capability::Full,
        None,
        owner,
    )
    .await
    .unwrap();

    repo.delete(ResourceKind::File, file_id, subject)
        .await
        .unwrap();

    assert!(
        repo.find(ResourceKind::File, file_id, subject)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn deleting_a_nonexistent_grant_is_not_found() {
    let (repo, file_id, _, subject) = setup().await;

    let result = repo.delete(ResourceKind::File, file_id, subject).await;
    match result {
        Err(LecternError::NotFound { entity, .. }) => assert_eq!(entity, "access grant"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_rows_drop_out_of_active_listings_but_still_exist() {
    let (repo, file_id, owner, subject) = setup().await;

    repo.upsert_many(
        ResourceKind::File,
        file_id,
        vec![subject],
        Capability::View,
        Some(Utc::now() - Duration::hours(1)),
        owner,
    )
    .await
    .unwrap();

    // The row is still stored...
    let stored = repo
        .find(ResourceKind::File, file_id, subject)
        .await
        .unwrap();
    assert!(stored.is_some());

    // ...but the read-time filter treats it as absent.
    let active = repo
        .active_resource_ids_for_subject(ResourceKind::File, subject)
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn unexpired_rows_are_listed_as_active() {
    let (repo, file_id, owner, subject) = setup().await;

    repo.upsert_many(
        ResourceKind::File,
        file_id,
        vec![subject],
        Capability::View,
        Some(Utc::now() + Duration::hours(1)),
        owner,
    )
    .await
    .unwrap();

    let active = repo
        .active_resource_ids_for_subject(ResourceKind::File, subject)
        .await
        .unwrap();
    assert_eq!(active, vec![file_id]);
}
