//! Availability check for a single assignment.

use uuid::Uuid;

use super::AssignmentStore;
use crate::repository::{UnitRepository, UserRepository};
use common::{AppError, AppResult};
use domain::{AssignmentConflict, Unit};

/// Check that `candidate_user_id` may take `unit_id`.
///
/// Returns the unit row when it exists so callers can build the
/// [`domain::Assignment`] without reading it again. An unknown unit yields
/// `Ok(None)`: existence is the caller's concern. Non-DO units always pass.
///
/// # Errors
/// [`AssignmentConflict::UnitTaken`] when another live user holds the DO
/// unit. Users listed in `exclude_user_id` never count as holders.
pub async fn check_available<S>(
    store: &S,
    unit_id: Uuid,
    candidate_user_id: Uuid,
    exclude_user_id: Option<Uuid>,
) -> AppResult<Option<Unit>>
where
    S: AssignmentStore + ?Sized,
{
    let Some(unit) = store.find_unit(unit_id).await? else {
        return Ok(None);
    };

    if !unit.is_do_unit() {
        return Ok(Some(unit));
    }

    if let Some(holder) = store.find_live_holder(unit_id, exclude_user_id).await? {
        tracing::warn!(
            unit = %unit.full_name,
            holder_id = %holder.id,
            candidate_id = %candidate_user_id,
            "DO unit already has a live holder"
        );
        return Err(AppError::Assignment(AssignmentConflict::UnitTaken {
            unit_name: unit.full_name,
            holder_name: holder.name,
        }));
    }

    Ok(Some(unit))
}

/// Name the winner of a lost race on the exclusivity index.
///
/// Call with the error of a rolled-back assignment transaction. A
/// [`AssignmentConflict::Contended`] is rebuilt into
/// [`AssignmentConflict::UnitTaken`] from the row now holding the marker;
/// any other error is returned untouched. If the lookup fails or the
/// holder is already gone, the original error is kept.
pub async fn explain_contention(
    users: &dyn UserRepository,
    units: &dyn UnitRepository,
    err: AppError,
) -> AppError {
    let AppError::Assignment(AssignmentConflict::Contended { unit_id }) = &err else {
        return err;
    };
    let unit_id = *unit_id;

    match taken_by(users, units, unit_id).await {
        Ok(Some(conflict)) => conflict.into(),
        Ok(None) => err,
        Err(lookup_err) => {
            tracing::warn!(%unit_id, "Could not name the DO unit holder: {}", lookup_err);
            err
        }
    }
}

async fn taken_by(
    users: &dyn UserRepository,
    units: &dyn UnitRepository,
    unit_id: Uuid,
) -> AppResult<Option<AssignmentConflict>> {
    let Some(holder) = users.find_exclusive_holder(unit_id).await? else {
        return Ok(None);
    };
    let Some(unit) = units.find_by_id(unit_id).await? else {
        return Ok(None);
    };

    Ok(Some(AssignmentConflict::UnitTaken {
        unit_name: unit.full_name,
        holder_name: holder.name,
    }))
}
