//! Integration tests for the Membership repository: atomic delta
//! application and the unique-pair invariant.

use lectern_core::identity::UserType;
use lectern_core::models::group::CreateGroup;
use lectern_core::models::membership::{GroupRole, MemberSpec, MembershipDelta};
use lectern_core::models::user::CreateUser;
use lectern_core::repository::{GroupRepository, MembershipRepository, UserRepository};
use lectern_db::repository::{
    SurrealGroupRepository, SurrealMembershipRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: in-memory DB with one group (owned by the first user) and
/// three users.
async fn setup() -> (
    SurrealMembershipRepository<surrealdb::engine::local::Db>,
    SurrealGroupRepository<surrealdb::engine::local::Db>,
    Uuid,       // group_id
    [Uuid; 3],  // user ids
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    lectern_db::run_migrations(&db).await.unwrap();

    let user_repo = SurrealUserRepository::new(db.clone());
    let mut users = [Uuid::nil(); 3];
    for (i, name) in ["ana", "ben", "cam"].iter().enumerate() {
        users[i] = user_repo
            .create(CreateUser {
                username: (*name).into(),
                full_name: format!("User {name}"),
                email: format!("{name}@example.com"),
                user_type: UserType::Regular,
            })
            .await
            .unwrap()
            .id;
    }

    let group_repo = SurrealGroupRepository::new(db.clone());
    let group = group_repo
        .create(CreateGroup { name: "Team".into() }, users[0])
        .await
        .unwrap();

    (
        SurrealMembershipRepository::new(db),
        group_repo,
        group.id,
        users,
    )
}

#[tokio::test]
async fn delta_applies_adds_updates_and_removes() {
    let (repo, _, group_id, [a, b, c]) = setup().await;

    repo.apply_delta(
        group_id,
        MembershipDelta {
            to_add: vec![MemberSpec::leader(a), MemberSpec::member(b)],
            ..Default::default()
        },
        a,
    )
    .await
    .unwrap();

    // Remove b, promote a, add c — one transaction.
    repo.apply_delta(
        group_id,
        MembershipDelta {
            to_remove: vec![b],
            to_update: vec![MemberSpec::member(a)],
            to_add: vec![MemberSpec::member(c)],
        },
        a,
    )
    .await
    .unwrap();

    let rows = repo.list_for_group(group_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    let role_of = |id: Uuid| rows.iter().find(|m| m.user_id == id).map(|m| m.role);
    assert_eq!(role_of(a), Some(GroupRole::Member));
    assert_eq!(role_of(c), Some(GroupRole::Member));
    assert_eq!(role_of(b), None);
}

#[tokio::test]
async fn role_update_preserves_creation_audit() {
    let (repo, _, group_id, [a, b, _]) = setup().await;

    repo.apply_delta(
        group_id,
        MembershipDelta {
            to_add: vec![MemberSpec::member(b)],
            ..Default::default()
        },
        a,
    )
    .await
    .unwrap();
    let before = repo.find(group_id, b).await.unwrap().unwrap();

    repo.apply_delta(
        group_id,
        MembershipDelta {
            to_update: vec![MemberSpec::leader(b)],
            ..Default::default()
        },
        a,
    )
    .await
    .unwrap();
    let after = repo.find(group_id, b).await.unwrap().unwrap();

    assert_eq!(after.role, GroupRole::Leader);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.created_by, before.created_by);
    assert_eq!(after.updated_by, Some(a));
}

#[tokio::test]
async fn duplicate_pair_is_rejected_by_the_unique_index() {
    let (repo, _, group_id, [a, b, _]) = setup().await;

    repo.apply_delta(
        group_id,
        MembershipDelta {
            to_add: vec![MemberSpec::member(b)],
            ..Default::default()
        },
        a,
    )
    .await
    .unwrap();

    let result = repo
        .apply_delta(
            group_id,
            MembershipDelta {
                to_add: vec![MemberSpec::leader(b)],
                ..Default::default()
            },
            a,
        )
        .await;

    assert!(result.is_err(), "second row for the same pair must fail");
    let rows = repo.list_for_group(group_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role, GroupRole::Member);
}

#[tokio::test]
async fn failed_delta_leaves_no_partial_write() {
    let (repo, _, group_id, [a, b, c]) = setup().await;

    repo.apply_delta(
        group_id,
        MembershipDelta {
            to_add: vec![MemberSpec::member(a)],
            ..Default::default()
        },
        a,
    )
    .await
    .unwrap();

    // c is fine on its own, but the duplicate `a` aborts the
    // transaction; neither insert may survive.
    let result = repo
        .apply_delta(
            group_id,
            MembershipDelta {
                to_add: vec![MemberSpec::member(c), MemberSpec::member(a)],
                ..Default::default()
            },
            b,
        )
        .await;

    assert!(result.is_err());
    let rows = repo.list_for_group(group_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, a);
}

#[tokio::test]
async fn delta_touches_group_audit_fields() {
    let (repo, groups, group_id, [_, b, _]) = setup().await;
    let before = groups.get_by_id(group_id).await.unwrap();

    repo.apply_delta(
        group_id,
        MembershipDelta {
            to_add: vec![MemberSpec::member(b)],
            ..Default::default()
        },
        b,
    )
    .await
    .unwrap();

    let after = groups.get_by_id(group_id).await.unwrap();
    assert_eq!(after.updated_by, Some(b));
    assert!(after.updated_at >= before.updated_at);
}

#[tokio::test]
async fn empty_delta_is_a_no_op() {
    let (repo, groups, group_id, [a, _, _]) = setup().await;
    let before = groups.get_by_id(group_id).await.unwrap();

    repo.apply_delta(group_id, MembershipDelta::default(), a)
        .await
        .unwrap();

    // No write happened: the group audit fields were not touched.
    let after = groups.get_by_id(group_id).await.unwrap();
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(after.updated_by, None);
}

#[tokio::test]
async fn user_axis_delta_moves_a_user_between_groups() {
    let (repo, groups, group_id, [a, b, _]) = setup().await;
    let second = groups
        .create(CreateGroup { name: "Other".into() }, a)
        .await
        .unwrap();

    repo.apply_user_delta(b, vec![], vec![group_id], a)
        .await
        .unwrap();
    repo.apply_user_delta(b, vec![group_id], vec![second.id], a)
        .await
        .unwrap();

    let rows = repo.list_for_user(b).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].group_id, second.id);
    assert_eq!(rows[0].role, GroupRole::Member);
}
