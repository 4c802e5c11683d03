//! Transactional application of a validated bulk approval.

use super::{guard, AssignmentStore};
use common::{AppError, AppResult};
use domain::{Assignment, AssignmentCandidate, BatchOutcome, FIELD_USERS};

/// Apply candidates in input order against `store`.
///
/// Run this with a transaction-bound store after
/// [`super::detect_batch_conflicts`] has accepted the batch. Users that
/// vanished or were approved since the request was built are skipped.
/// Any error leaves the caller to roll back, so earlier writes in the same
/// batch never survive a later conflict.
pub async fn apply_batch<S>(store: &S, candidates: &[AssignmentCandidate]) -> AppResult<BatchOutcome>
where
    S: AssignmentStore + ?Sized,
{
    let mut outcome = BatchOutcome::default();

    for candidate in candidates {
        let pending = store
            .find_user(candidate.user_id)
            .await?
            .filter(|user| user.is_pending());
        if pending.is_none() {
            tracing::debug!(user_id = %candidate.user_id, "Skipping stale approval");
            outcome.skipped.push(candidate.user_id);
            continue;
        }

        let unit = guard::check_available(
            store,
            candidate.unit_id,
            candidate.user_id,
            Some(candidate.user_id),
        )
        .await?
        .ok_or_else(|| {
            AppError::field(
                FIELD_USERS,
                format!("Bulk approval failed: unit {} does not exist.", candidate.unit_id),
            )
        })?;

        store
            .assign(candidate.user_id, Assignment::new(candidate.role, Some(&unit)))
            .await?;
        outcome.applied.push(candidate.user_id);
    }

    Ok(outcome)
}
