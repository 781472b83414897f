//! Integration tests for the membership reconciler, wired against
//! in-memory SurrealDB repositories.

use lectern_access::MembershipService;
use lectern_core::error::LecternError;
use lectern_core::identity::{Identity, UserType};
use lectern_core::models::group::CreateGroup;
use lectern_core::models::membership::{GroupRole, MemberSpec};
use lectern_core::models::user::CreateUser;
use lectern_core::repository::{GroupRepository, MembershipRepository, UserRepository};
use lectern_db::repository::{
    SurrealGroupRepository, SurrealMembershipRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;
type Service =
    MembershipService<SurrealGroupRepository<Db>, SurrealUserRepository<Db>, SurrealMembershipRepository<Db>>;

struct Fixture {
    service: Service,
    groups: SurrealGroupRepository<Db>,
    memberships: SurrealMembershipRepository<Db>,
    group_id: Uuid,
    owner: Identity,
    admin: Identity,
    users: [Uuid; 4],
}

/// One group owned by `owner`, an admin, and four regular users.
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    lectern_db::run_migrations(&db).await.unwrap();

    let user_repo = SurrealUserRepository::new(db.clone());
    let mut ids = Vec::new();
    for (name, user_type) in [
        ("owner", UserType::Regular),
        ("root", UserType::Admin),
        ("ana", UserType::Regular),
        ("ben", UserType::Regular),
        ("cam", UserType::Regular),
        ("dee", UserType::Regular),
    ] {
        let user = user_repo
            .create(CreateUser {
                username: name.into(),
                full_name: format!("User {name}"),
                email: format!("{name}@example.com"),
                user_type,
            })
            .await
            .unwrap();
        ids.push((user.id, user_type));
    }

    let owner = Identity::new(ids[0].0, ids[0].1);
    let admin = Identity::new(ids[1].0, ids[1].1);
    let users = [ids[2].0, ids[3].0, ids[4].0, ids[5].0];

    let group_repo = SurrealGroupRepository::new(db.clone());
    let group = group_repo
        .create(CreateGroup { name: "Team".into() }, owner.user_id)
        .await
        .unwrap();

    Fixture {
        service: MembershipService::new(
            SurrealGroupRepository::new(db.clone()),
            SurrealUserRepository::new(db.clone()),
            SurrealMembershipRepository::new(db.clone()),
        ),
        groups: group_repo,
        memberships: SurrealMembershipRepository::new(db),
        group_id: group.id,
        owner,
        admin,
        users,
    }
}

fn regular(id: Uuid) -> Identity {
    Identity::new(id, UserType::Regular)
}

#[tokio::test]
async fn reconcile_removes_adds_and_keeps_in_one_pass() {
    let fx = setup().await;
    let [a, b, c, _] = fx.users;

    // Start with {a: Leader, b: Member}.
    fx.service
        .reconcile(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::member(b)],
            &fx.owner,
        )
        .await
        .unwrap();
    let a_before = fx.memberships.find(fx.group_id, a).await.unwrap().unwrap();

    // Target {a: Leader, c: Member}: b removed, c added, a untouched.
    fx.service
        .reconcile(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::member(c)],
            &fx.owner,
        )
        .await
        .unwrap();

    let rows = fx.memberships.list_for_group(fx.group_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    let find = |id: Uuid| rows.iter().find(|m| m.user_id == id);
    assert_eq!(find(a).unwrap().role, GroupRole::Leader);
    assert_eq!(find(c).unwrap().role, GroupRole::Member);
    assert!(find(b).is_none());

    // a's row survived untouched, not as a remove+add.
    let a_after = find(a).unwrap();
    assert_eq!(a_after.created_at, a_before.created_at);
    assert_eq!(a_after.updated_at, a_before.updated_at);
}

#[tokio::test]
async fn an_owning_leader_may_replace_the_roster() {
    let fx = setup().await;
    let [a, b, c, _] = fx.users;

    // a owns the group and sits in it as Leader.
    let group = fx
        .groups
        .create(CreateGroup { name: "A's group".into() }, a)
        .await
        .unwrap();
    fx.service
        .reconcile(
            group.id,
            vec![MemberSpec::leader(a), MemberSpec::member(b)],
            &regular(a),
        )
        .await
        .unwrap();

    // Ownership, not the Leader role, is what authorizes the
    // remove+add here.
    fx.service
        .reconcile(
            group.id,
            vec![MemberSpec::leader(a), MemberSpec::member(c)],
            &regular(a),
        )
        .await
        .unwrap();

    let rows = fx.memberships.list_for_group(group.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|m| m.user_id == a && m.role == GroupRole::Leader));
    assert!(rows.iter().any(|m| m.user_id == c && m.role == GroupRole::Member));
    assert!(!rows.iter().any(|m| m.user_id == b));
}

#[tokio::test]
async fn reconcile_is_idempotent_and_second_call_writes_nothing() {
    let fx = setup().await;
    let [a, b, _, _] = fx.users;
    let desired = vec![MemberSpec::leader(a), MemberSpec::member(b)];

    fx.service
        .reconcile(fx.group_id, desired.clone(), &fx.owner)
        .await
        .unwrap();
    let group_after_first = fx.groups.get_by_id(fx.group_id).await.unwrap();
    let rows_after_first = fx.memberships.list_for_group(fx.group_id).await.unwrap();

    fx.service
        .reconcile(fx.group_id, desired, &fx.owner)
        .await
        .unwrap();

    // Same final set, and the group's audit fields prove no write
    // happened on the second call.
    let group_after_second = fx.groups.get_by_id(fx.group_id).await.unwrap();
    assert_eq!(group_after_second.updated_at, group_after_first.updated_at);
    let rows_after_second = fx.memberships.list_for_group(fx.group_id).await.unwrap();
    assert_eq!(rows_after_second.len(), rows_after_first.len());
}

#[tokio::test]
async fn reconcile_with_an_unknown_user_changes_nothing() {
    let fx = setup().await;
    let [a, b, _, _] = fx.users;

    fx.service
        .reconcile(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::member(b)],
            &fx.owner,
        )
        .await
        .unwrap();

    let result = fx
        .service
        .reconcile(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::member(Uuid::new_v4())],
            &fx.owner,
        )
        .await;

    match result {
        Err(LecternError::Validation { .. }) => {}
        other => panic!("expected Validation, got {other:?}"),
    }

    // Membership is completely unchanged: b is still in, and still a
    // Member.
    let rows = fx.memberships.list_for_group(fx.group_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|m| m.user_id == b && m.role == GroupRole::Member));
}

#[tokio::test]
async fn reconcile_of_a_missing_group_is_not_found() {
    let fx = setup().await;
    let result = fx
        .service
        .reconcile(Uuid::new_v4(), vec![], &fx.owner)
        .await;
    assert!(matches!(result, Err(LecternError::NotFound { .. })));
}

#[tokio::test]
async fn outsiders_and_plain_members_may_not_reconcile() {
    let fx = setup().await;
    let [a, b, _, _] = fx.users;

    fx.service
        .reconcile(fx.group_id, vec![MemberSpec::member(a)], &fx.owner)
        .await
        .unwrap();

    // b is not a member at all.
    let result = fx
        .service
        .reconcile(fx.group_id, vec![], &regular(b))
        .await;
    assert!(matches!(result, Err(LecternError::Forbidden { .. })));

    // a is a member but not a Leader.
    let result = fx
        .service
        .reconcile(fx.group_id, vec![MemberSpec::leader(a)], &regular(a))
        .await;
    assert!(matches!(result, Err(LecternError::Forbidden { .. })));
}

#[tokio::test]
async fn a_leader_may_reconcile_roles_but_not_the_roster() {
    let fx = setup().await;
    let [a, b, c, _] = fx.users;

    fx.service
        .reconcile(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::member(b)],
            &fx.owner,
        )
        .await
        .unwrap();

    // Pure role change: allowed for the Leader.
    fx.service
        .reconcile(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::leader(b)],
            &regular(a),
        )
        .await
        .unwrap();
    assert_eq!(
        fx.service.role_of(fx.group_id, b).await.unwrap(),
        Some(GroupRole::Leader)
    );

    // Changing the roster is not.
    let result = fx
        .service
        .reconcile(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::leader(b), MemberSpec::member(c)],
            &regular(a),
        )
        .await;
    assert!(matches!(result, Err(LecternError::Forbidden { .. })));
}

#[tokio::test]
async fn admin_may_reconcile_any_group() {
    let fx = setup().await;
    let [a, _, _, _] = fx.users;

    fx.service
        .reconcile(fx.group_id, vec![MemberSpec::leader(a)], &fx.admin)
        .await
        .unwrap();
    assert_eq!(
        fx.service.role_of(fx.group_id, a).await.unwrap(),
        Some(GroupRole::Leader)
    );
}

#[tokio::test]
async fn adding_an_existing_pair_is_a_no_op() {
    let fx = setup().await;
    let [a, b, _, _] = fx.users;

    fx.service
        .add_members(
            fx.group_id,
            vec![MemberSpec::leader(a), MemberSpec::member(b)],
            &fx.owner,
        )
        .await
        .unwrap();

    // Re-adding a (as Member!) must neither duplicate nor demote.
    fx.service
        .add_members(fx.group_id, vec![MemberSpec::member(a)], &fx.owner)
        .await
        .unwrap();

    let rows = fx.memberships.list_for_group(fx.group_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        fx.service.role_of(fx.group_id, a).await.unwrap(),
        Some(GroupRole::Leader)
    );
}

#[tokio::test]
async fn add_members_rejects_a_batch_with_unknown_users() {
    let fx = setup().await;
    let [a, _, _, _] = fx.users;

    let result = fx
        .service
        .add_members(
            fx.group_id,
            vec![MemberSpec::member(a), MemberSpec::member(Uuid::new_v4())],
            &fx.owner,
        )
        .await;

    assert!(matches!(result, Err(LecternError::Validation { .. })));
    let rows = fx.memberships.list_for_group(fx.group_id).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn removing_an_absent_pair_is_a_no_op() {
    let fx = setup().await;
    let [a, b, _, _] = fx.users;

    fx.service
        .add_members(fx.group_id, vec![MemberSpec::member(a)], &fx.owner)
        .await
        .unwrap();

    fx.service
        .remove_members(fx.group_id, vec![a, b], &fx.owner)
        .await
        .unwrap();

    let rows = fx.memberships.list_for_group(fx.group_id).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn update_member_role_honors_the_leader_gate() {
    let fx = setup().await;
    let [a, b, c, _] = fx.users;

    fx.service
        .add_members(
            fx.group_id,
            vec![
                MemberSpec::leader(a),
                MemberSpec::member(b),
                MemberSpec::member(c),
            ],
            &fx.owner,
        )
        .await
        .unwrap();

    // A plain member may not change roles.
    let result = fx
        .service
        .update_member_role(fx.group_id, c, GroupRole::Leader, &regular(b))
        .await;
    assert!(matches!(result, Err(LecternError::Forbidden { .. })));

    // A Leader may.
    fx.service
        .update_member_role(fx.group_id, b, GroupRole::Leader, &regular(a))
        .await
        .unwrap();
    assert_eq!(
        fx.service.role_of(fx.group_id, b).await.unwrap(),
        Some(GroupRole::Leader)
    );

    // Targeting a non-member is NotFound.
    let result = fx
        .service
        .update_member_role(fx.group_id, fx.admin.user_id, GroupRole::Member, &fx.owner)
        .await;
    assert!(matches!(result, Err(LecternError::NotFound { .. })));
}

#[tokio::test]
async fn reconcile_user_groups_is_admin_only_and_diffs_by_group() {
    let fx = setup().await;
    let [a, _, _, _] = fx.users;
    let second = fx
        .groups
        .create(CreateGroup { name: "Second".into() }, fx.owner.user_id)
        .await
        .unwrap();

    let result = fx
        .service
        .reconcile_user_groups(a, vec![fx.group_id], &fx.owner)
        .await;
    assert!(matches!(result, Err(LecternError::Forbidden { .. })));

    fx.service
        .reconcile_user_groups(a, vec![fx.group_id], &fx.admin)
        .await
        .unwrap();
    fx.service
        .reconcile_user_groups(a, vec![second.id], &fx.admin)
        .await
        .unwrap();

    let rows = fx.service.groups_of(a).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].group_id, second.id);
}

#[tokio::test]
async fn reconcile_user_groups_rejects_unknown_groups_wholesale() {
    let fx = setup().await;
    let [a, _, _, _] = fx.users;

    let result = fx
        .service
        .reconcile_user_groups(a, vec![fx.group_id, Uuid::new_v4()], &fx.admin)
        .await;

    assert!(matches!(result, Err(LecternError::Validation { .. })));
    assert!(fx.service.groups_of(a).await.unwrap().is_empty());
}
