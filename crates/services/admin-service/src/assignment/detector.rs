//! Pre-transaction conflict detection for bulk approvals.

use uuid::Uuid;

use crate::repository::UnitRepository;
use common::{AppError, AppResult};
use domain::{find_batch_conflict, referenced_unit_ids, AssignmentCandidate, Unit, FIELD_USERS};

/// Reject a batch that claims one DO unit for more than one user.
///
/// Loads the distinct units the batch references, then reports the first
/// contested DO unit in input order. No writes happen here; a failure
/// leaves storage untouched.
///
/// # Errors
/// - `users` field error when a referenced unit does not exist
/// - [`domain::AssignmentConflict::BatchDuplicate`] for an internal conflict
pub async fn detect_batch_conflicts(
    units: &dyn UnitRepository,
    candidates: &[AssignmentCandidate],
) -> AppResult<Vec<Unit>> {
    let unit_ids = referenced_unit_ids(candidates);
    let found = units.find_by_ids(unit_ids.clone()).await?;

    if let Some(missing) = first_missing(&unit_ids, &found) {
        return Err(AppError::field(
            FIELD_USERS,
            format!("Bulk approval failed: unit {} does not exist.", missing),
        ));
    }

    if let Some(conflict) = find_batch_conflict(candidates, &found) {
        tracing::warn!(
            unit = conflict.unit_name().unwrap_or_default(),
            "Bulk approval rejected before any write"
        );
        return Err(conflict.into());
    }

    Ok(found)
}

fn first_missing(wanted: &[Uuid], found: &[Unit]) -> Option<Uuid> {
    wanted
        .iter()
        .copied()
        .find(|id| !found.iter().any(|unit| unit.id == *id))
}
