//! DO unit single-holder rule against a real (SQLite) database.

mod support;

use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use admin_service_lib::repository::entities::user as user_entity;
use admin_service_lib::service::{UnitService, UserService};
use common::AppError;
use domain::{
    ApproveUser, AssignmentCandidate, AssignmentConflict, UpdateUnit, UpdateUser, UserRole,
};
use support::setup;

fn candidate(user_id: Uuid, unit_id: Uuid) -> AssignmentCandidate {
    AssignmentCandidate {
        user_id,
        unit_id,
        role: UserRole::Encoder,
    }
}

fn approval(unit_id: Uuid) -> ApproveUser {
    ApproveUser {
        role: UserRole::Viewer,
        unit_id,
    }
}

// =============================================================================
// Single approval and update
// =============================================================================

#[tokio::test]
async fn test_approval_into_held_do_unit_names_unit_and_holder() {
    let app = setup().await;
    let unit = app.unit("cpmsd/do").await;
    app.approved("Alice", &unit).await;
    let bob = app.pending("Bob").await;

    let err = app.users.approve_user(bob.id, approval(unit.id)).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Assignment(AssignmentConflict::UnitTaken { .. })
    ));
    assert_eq!(err.to_string(), "The unit CPMSD/DO is already assigned to Alice.");
    let fields = err.fields().unwrap();
    assert_eq!(
        fields["unit_id"],
        vec!["The unit CPMSD/DO is already assigned to Alice.".to_string()]
    );

    let bob = app.reload(&bob).await;
    assert!(bob.is_pending());
    assert_eq!(bob.unit_id, None);
}

#[tokio::test]
async fn test_approving_same_user_twice_is_idempotent() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    let alice = app.pending("Alice").await;

    let first = app.users.approve_user(alice.id, approval(unit.id)).await.unwrap();
    let second = app.users.approve_user(alice.id, approval(unit.id)).await.unwrap();

    assert_eq!(first.unit_id, Some(unit.id));
    assert_eq!(second.unit_id, Some(unit.id));
    assert_eq!(second.role, UserRole::Viewer);
}

#[tokio::test]
async fn test_non_do_unit_takes_any_number_of_users() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;

    let alice = app.approved("Alice", &unit).await;
    let bob = app.approved("Bob", &unit).await;
    let carol = app.create("Carol", UserRole::Clerk, Some(&unit)).await;

    for user in [alice, bob, carol] {
        assert_eq!(user.unit_id, Some(unit.id));
        assert!(!user.is_pending());
    }
}

#[tokio::test]
async fn test_unknown_unit_on_approval_is_field_error() {
    let app = setup().await;
    let alice = app.pending("Alice").await;

    let err = app
        .users
        .approve_user(alice.id, approval(Uuid::new_v4()))
        .await
        .unwrap_err();

    let fields = err.fields().unwrap();
    assert_eq!(fields["unit_id"], vec!["The selected unit does not exist.".to_string()]);
}

#[tokio::test]
async fn test_approval_with_pending_role_rejected() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    let alice = app.pending("Alice").await;

    let err = app
        .users
        .approve_user(
            alice.id,
            ApproveUser {
                role: UserRole::Pending,
                unit_id: unit.id,
            },
        )
        .await
        .unwrap_err();

    assert!(err.fields().unwrap().contains_key("role"));
}

#[tokio::test]
async fn test_update_into_held_do_unit_rejected_without_write() {
    let app = setup().await;
    let held = app.unit("CPMSD/DO").await;
    let other = app.unit("CPMSD/RECORDS").await;
    app.approved("Alice", &held).await;
    let bob = app.approved("Bob", &other).await;

    let err = app
        .users
        .update_user(
            bob.id,
            UpdateUser {
                username: "bobby".to_string(),
                email: bob.email.clone(),
                name: "Bobby".to_string(),
                role: UserRole::Clerk,
                unit_id: Some(held.id),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "The unit CPMSD/DO is already assigned to Alice.");
    let bob = app.reload(&bob).await;
    assert_eq!(bob.username, "bob");
    assert_eq!(bob.unit_id, Some(other.id));
}

#[tokio::test]
async fn test_holder_can_edit_own_profile_and_keep_unit() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    let alice = app.approved("Alice", &unit).await;

    let updated = app
        .users
        .update_user(
            alice.id,
            UpdateUser {
                username: alice.username.clone(),
                email: alice.email.clone(),
                name: "Alice Reyes".to_string(),
                role: UserRole::Admin,
                unit_id: Some(unit.id),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Alice Reyes");
    assert_eq!(updated.role, UserRole::Admin);
    assert_eq!(updated.unit_id, Some(unit.id));
}

#[tokio::test]
async fn test_pending_user_may_reference_held_do_unit() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    app.approved("Alice", &unit).await;

    let bob = app.create("Bob", UserRole::Pending, Some(&unit)).await;

    assert!(bob.is_pending());
    assert_eq!(bob.unit_id, Some(unit.id));
}

#[tokio::test]
async fn test_holder_demoted_to_pending_frees_the_unit() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    let alice = app.approved("Alice", &unit).await;
    let bob = app.pending("Bob").await;

    app.users
        .update_user(
            alice.id,
            UpdateUser {
                username: alice.username.clone(),
                email: alice.email.clone(),
                name: alice.name.clone(),
                role: UserRole::Pending,
                unit_id: Some(unit.id),
            },
        )
        .await
        .unwrap();

    let bob = app.users.approve_user(bob.id, approval(unit.id)).await.unwrap();
    assert_eq!(bob.unit_id, Some(unit.id));
}

#[tokio::test]
async fn test_admin_creation_into_held_do_unit_rejected() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    app.approved("Alice", &unit).await;

    let err = app
        .users
        .create_user(domain::CreateUser {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: support::PASSWORD.to_string(),
            name: "Bob".to_string(),
            role: Some(UserRole::Encoder),
            unit_id: Some(unit.id),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Assignment(_)));
    let (users, total) = app
        .users
        .list_users(admin_service_lib::repository::UserPage {
            page: 1,
            per_page: 20,
            role: None,
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(users[0].name, "Alice");
}

// =============================================================================
// Bulk approval
// =============================================================================

#[tokio::test]
async fn test_batch_claiming_one_do_unit_twice_writes_nothing() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    let alice = app.pending("Alice").await;
    let bob = app.pending("Bob").await;

    let err = app
        .users
        .bulk_approve(vec![candidate(alice.id, unit.id), candidate(bob.id, unit.id)])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Assignment(AssignmentConflict::BatchDuplicate { attempted: 2, .. })
    ));
    assert_eq!(
        err.fields().unwrap()["users"],
        vec!["Bulk approval failed: CPMSD/DO can only have one approved user.".to_string()]
    );
    assert!(app.reload(&alice).await.is_pending());
    assert!(app.reload(&bob).await.is_pending());
}

#[tokio::test]
async fn test_batch_with_stale_user_applies_the_rest() {
    let app = setup().await;
    let records = app.unit("CPMSD/RECORDS").await;
    let do_unit = app.unit("CPMSD/DO").await;
    let finance_do = app.unit("FINANCE/DO").await;
    let already = app.approved("Alice", &records).await;
    let bob = app.pending("Bob").await;

    let outcome = app
        .users
        .bulk_approve(vec![
            candidate(already.id, finance_do.id),
            candidate(bob.id, do_unit.id),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.applied_count(), 1);
    assert_eq!(outcome.applied, vec![bob.id]);
    assert_eq!(outcome.skipped, vec![already.id]);
    assert_eq!(app.reload(&already).await.unit_id, Some(records.id));
    assert_eq!(app.reload(&bob).await.unit_id, Some(do_unit.id));

    // The skipped item left FINANCE/DO free.
    let carol = app.pending("Carol").await;
    let carol = app.users.approve_user(carol.id, approval(finance_do.id)).await.unwrap();
    assert_eq!(carol.unit_id, Some(finance_do.id));
}

#[tokio::test]
async fn test_deleted_user_in_batch_is_skipped() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;
    let alice = app.pending("Alice").await;

    let outcome = app
        .users
        .bulk_approve(vec![candidate(Uuid::new_v4(), unit.id), candidate(alice.id, unit.id)])
        .await
        .unwrap();

    assert_eq!(outcome.applied, vec![alice.id]);
    assert_eq!(outcome.skipped.len(), 1);
}

#[tokio::test]
async fn test_conflict_inside_transaction_rolls_back_earlier_items() {
    let app = setup().await;
    let records = app.unit("CPMSD/RECORDS").await;
    let do_unit = app.unit("CPMSD/DO").await;
    app.approved("Carol", &do_unit).await;
    let alice = app.pending("Alice").await;
    let bob = app.pending("Bob").await;

    let err = app
        .users
        .bulk_approve(vec![
            candidate(alice.id, records.id),
            candidate(bob.id, do_unit.id),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "The unit CPMSD/DO is already assigned to Carol.");
    let alice = app.reload(&alice).await;
    assert!(alice.is_pending());
    assert_eq!(alice.unit_id, None);
}

#[tokio::test]
async fn test_batch_spreading_users_over_units_succeeds() {
    let app = setup().await;
    let north = app.unit("NORTH/DO").await;
    let south = app.unit("SOUTH/DO").await;
    let records = app.unit("NORTH/RECORDS").await;
    let users = [
        app.pending("Ann").await,
        app.pending("Ben").await,
        app.pending("Cid").await,
        app.pending("Dee").await,
    ];

    let outcome = app
        .users
        .bulk_approve(vec![
            candidate(users[0].id, north.id),
            candidate(users[1].id, south.id),
            candidate(users[2].id, records.id),
            candidate(users[3].id, records.id),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.applied_count(), 4);
}

#[tokio::test]
async fn test_empty_batch_rejected() {
    let app = setup().await;

    let err = app.users.bulk_approve(Vec::new()).await.unwrap_err();

    assert_eq!(
        err.fields().unwrap()["users"],
        vec!["Select at least one user to approve.".to_string()]
    );
}

#[tokio::test]
async fn test_batch_referencing_unknown_unit_rejected() {
    let app = setup().await;
    let alice = app.pending("Alice").await;

    let err = app
        .users
        .bulk_approve(vec![candidate(alice.id, Uuid::new_v4())])
        .await
        .unwrap_err();

    assert!(err.fields().unwrap().contains_key("users"));
    assert!(app.reload(&alice).await.is_pending());
}

// =============================================================================
// Storage backstop
// =============================================================================

/// A user row written straight to storage, bypassing the service checks
fn rogue(role: &str, unit_id: Option<Uuid>, exclusive_unit_id: Option<Uuid>) -> user_entity::ActiveModel {
    let now = chrono::Utc::now();
    user_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set("rogue".to_string()),
        email: Set("rogue@example.com".to_string()),
        password_hash: Set("hash".to_string()),
        name: Set("Rogue".to_string()),
        role: Set(role.to_string()),
        unit_id: Set(unit_id),
        exclusive_unit_id: Set(exclusive_unit_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[tokio::test]
async fn test_unique_index_rejects_second_holder_written_directly() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    app.approved("Alice", &unit).await;

    let result = rogue(UserRole::Clerk.as_str(), Some(unit.id), Some(unit.id))
        .insert(app.database.connection())
        .await;

    assert!(matches!(
        result.unwrap_err().sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ));
}

#[tokio::test]
async fn test_index_rejection_names_the_marked_holder() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    // Marker without a matching unit_id: invisible to the guard, caught by the index.
    rogue(UserRole::Clerk.as_str(), None, Some(unit.id))
        .insert(app.database.connection())
        .await
        .unwrap();
    let bob = app.pending("Bob").await;

    let err = app.users.approve_user(bob.id, approval(unit.id)).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Assignment(AssignmentConflict::UnitTaken { .. })
    ));
    assert_eq!(
        err.fields().unwrap()["unit_id"],
        vec!["The unit CPMSD/DO is already assigned to Rogue.".to_string()]
    );
    assert!(app.reload(&bob).await.is_pending());
}

#[tokio::test]
async fn test_index_rejection_in_batch_names_the_marked_holder() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    rogue(UserRole::Viewer.as_str(), None, Some(unit.id))
        .insert(app.database.connection())
        .await
        .unwrap();
    let bob = app.pending("Bob").await;

    let err = app
        .users
        .bulk_approve(vec![candidate(bob.id, unit.id)])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "The unit CPMSD/DO is already assigned to Rogue.");
    assert!(app.reload(&bob).await.is_pending());
}

#[tokio::test]
async fn test_unrecognized_stored_role_does_not_hold_a_do_unit() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    let stored = rogue("retired", Some(unit.id), None)
        .insert(app.database.connection())
        .await
        .unwrap();
    let bob = app.pending("Bob").await;

    let approved = app.users.approve_user(bob.id, approval(unit.id)).await.unwrap();

    assert_eq!(approved.unit_id, Some(unit.id));
    let stored = app.users.get_user(stored.id).await.unwrap();
    assert_eq!(stored.role, UserRole::Pending);
}

#[tokio::test]
async fn test_unrecognized_stored_role_does_not_block_rename_into_do() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;
    app.approved("Alice", &unit).await;
    rogue("retired", Some(unit.id), None)
        .insert(app.database.connection())
        .await
        .unwrap();

    let renamed = app
        .units
        .update_unit(
            unit.id,
            UpdateUnit {
                code: None,
                full_name: Some("CPMSD/DO".to_string()),
                is_active: None,
            },
        )
        .await
        .unwrap();

    assert!(renamed.is_do_unit());
}
