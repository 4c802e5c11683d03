//! Unit maintenance tests, including renames that change DO status.

mod support;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tokio_test::assert_ok;
use uuid::Uuid;

use admin_service_lib::repository::entities::user as user_entity;
use admin_service_lib::service::{UnitService, UserService};
use common::AppError;
use domain::{ApproveUser, CreateUnit, UpdateUnit, UserRole};
use support::{setup, TestApp};

fn rename(full_name: &str) -> UpdateUnit {
    UpdateUnit {
        code: None,
        full_name: Some(full_name.to_string()),
        is_active: None,
    }
}

/// Users whose row carries the exclusivity marker for `unit_id`
async fn marked_holders(app: &TestApp, unit_id: Uuid) -> usize {
    user_entity::Entity::find()
        .filter(user_entity::Column::ExclusiveUnitId.eq(unit_id))
        .all(app.database.connection())
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_create_normalizes_full_name() {
    let app = setup().await;

    let unit = app
        .units
        .create_unit(CreateUnit {
            code: "  cpmsd-do ".to_string(),
            full_name: "  cpmsd/do ".to_string(),
            is_active: None,
        })
        .await
        .unwrap();

    assert_eq!(unit.code, "cpmsd-do");
    assert_eq!(unit.full_name, "CPMSD/DO");
    assert!(unit.is_active);
    assert!(unit.is_do_unit());
}

#[tokio::test]
async fn test_create_rejects_malformed_full_name() {
    let app = setup().await;

    let err = app
        .units
        .create_unit(CreateUnit {
            code: "X".to_string(),
            full_name: "NOSLASH".to_string(),
            is_active: None,
        })
        .await
        .unwrap_err();

    assert!(err.fields().unwrap().contains_key("full_name"));
}

#[tokio::test]
async fn test_create_rejects_blank_code() {
    let app = setup().await;

    let err = app
        .units
        .create_unit(CreateUnit {
            code: "   ".to_string(),
            full_name: "CPMSD/DO".to_string(),
            is_active: None,
        })
        .await
        .unwrap_err();

    assert_eq!(
        err.fields().unwrap()["code"],
        vec!["The unit code is required.".to_string()]
    );
}

#[tokio::test]
async fn test_duplicate_full_name_conflicts_after_normalization() {
    let app = setup().await;
    app.unit("CPMSD/DO").await;

    let err = app
        .units
        .create_unit(CreateUnit {
            code: "OTHER".to_string(),
            full_name: "cpmsd/do".to_string(),
            is_active: Some(false),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.to_string(), "Unit full name already exists");
}

#[tokio::test]
async fn test_duplicate_code_conflicts() {
    let app = setup().await;
    app.unit("CPMSD/DO").await;

    let err = app
        .units
        .create_unit(CreateUnit {
            code: "CPMSD-DO".to_string(),
            full_name: "CPMSD/RECORDS".to_string(),
            is_active: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Unit code already exists");
}

#[tokio::test]
async fn test_list_orders_by_full_name_and_filters_inactive() {
    let app = setup().await;
    app.unit("ZETA/DO").await;
    app.unit("ALPHA/DO").await;
    app.units
        .create_unit(CreateUnit {
            code: "OLD".to_string(),
            full_name: "MID/OLD".to_string(),
            is_active: Some(false),
        })
        .await
        .unwrap();

    let all = app.units.list_units(false).await.unwrap();
    let active = app.units.list_units(true).await.unwrap();

    let names: Vec<_> = all.iter().map(|unit| unit.full_name.as_str()).collect();
    assert_eq!(names, vec!["ALPHA/DO", "MID/OLD", "ZETA/DO"]);
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn test_partial_update_keeps_other_fields() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;

    let updated = app
        .units
        .update_unit(
            unit.id,
            UpdateUnit {
                code: None,
                full_name: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.code, unit.code);
    assert_eq!(updated.full_name, unit.full_name);
    assert!(!updated.is_active);
}

#[tokio::test]
async fn test_update_missing_unit_is_not_found() {
    let app = setup().await;

    let result = app.units.update_unit(Uuid::new_v4(), rename("A/B")).await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_delete_refused_while_unit_is_referenced() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;
    app.create("Alice", UserRole::Pending, Some(&unit)).await;

    let err = app.units.delete_unit(unit.id).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), "The unit is still assigned to 1 user(s).");
    assert_ok!(app.units.get_unit(unit.id).await);
}

#[tokio::test]
async fn test_delete_unused_unit() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;

    assert_ok!(app.units.delete_unit(unit.id).await);
    assert!(matches!(app.units.get_unit(unit.id).await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_rename_into_do_refused_with_several_holders() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;
    app.approved("Alice", &unit).await;
    app.approved("Bob", &unit).await;

    let err = app.units.update_unit(unit.id, rename("CPMSD/DO")).await.unwrap_err();

    assert_eq!(
        err.fields().unwrap()["full_name"],
        vec!["The unit has 2 approved users; a DO unit can only have one.".to_string()]
    );
    let unit = app.units.get_unit(unit.id).await.unwrap();
    assert_eq!(unit.full_name, "CPMSD/RECORDS");
}

#[tokio::test]
async fn test_rename_into_do_marks_sole_holder() {
    let app = setup().await;
    let unit = app.unit("CPMSD/RECORDS").await;
    app.approved("Alice", &unit).await;
    app.create("Bob", UserRole::Pending, Some(&unit)).await;

    let renamed = app.units.update_unit(unit.id, rename("cpmsd/do")).await.unwrap();

    assert!(renamed.is_do_unit());
    assert_eq!(marked_holders(&app, unit.id).await, 1);

    let carol = app.pending("Carol").await;
    let err = app
        .users
        .approve_user(
            carol.id,
            ApproveUser {
                role: UserRole::Viewer,
                unit_id: unit.id,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "The unit CPMSD/DO is already assigned to Alice.");
}

#[tokio::test]
async fn test_rename_out_of_do_clears_marker() {
    let app = setup().await;
    let unit = app.unit("CPMSD/DO").await;
    app.approved("Alice", &unit).await;
    assert_eq!(marked_holders(&app, unit.id).await, 1);

    assert_ok!(app.units.update_unit(unit.id, rename("CPMSD/RECORDS")).await);

    assert_eq!(marked_holders(&app, unit.id).await, 0);
    let bob = app.approved("Bob", &unit).await;
    assert_eq!(bob.unit_id, Some(unit.id));
}
