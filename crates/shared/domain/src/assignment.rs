//! Unit assignments and batch conflict detection.
//!
//! A DO unit may have at most one live (non-pending) user assigned. The
//! helpers here are storage-free; the service layer feeds them the rows it
//! loaded.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::FIELD_USERS;
use crate::error::{AssignmentConflict, DomainError, DomainResult};
use crate::unit::Unit;
use crate::user::UserRole;

/// One requested (user, unit, role) assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignmentCandidate {
    pub user_id: Uuid,
    pub unit_id: Uuid,
    pub role: UserRole,
}

/// Column values written for a user's role and unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub role: UserRole,
    pub unit_id: Option<Uuid>,
    /// Set only for live holders of a DO unit; carries the unique index
    /// that backs the single-holder rule in storage.
    pub exclusive_unit_id: Option<Uuid>,
}

impl Assignment {
    pub fn new(role: UserRole, unit: Option<&Unit>) -> Self {
        let exclusive_unit_id = unit
            .filter(|unit| role.is_live() && unit.is_do_unit())
            .map(|unit| unit.id);

        Self {
            role,
            unit_id: unit.map(|unit| unit.id),
            exclusive_unit_id,
        }
    }
}

/// Result of applying a bulk approval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BatchOutcome {
    /// Users approved, in request order
    pub applied: Vec<Uuid>,
    /// Users left untouched because they were missing or no longer pending
    pub skipped: Vec<Uuid>,
}

impl BatchOutcome {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Shape checks on a bulk approval request.
///
/// # Errors
/// Returns a `users` field error for an empty batch or a candidate whose
/// target role is `pending`.
pub fn validate_batch(candidates: &[AssignmentCandidate]) -> DomainResult<()> {
    if candidates.is_empty() {
        return Err(DomainError::field(FIELD_USERS, "Select at least one user to approve."));
    }

    if candidates.iter().any(|candidate| candidate.role.is_pending()) {
        return Err(DomainError::field(
            FIELD_USERS,
            "Bulk approval failed: approved users need a role other than pending.",
        ));
    }

    Ok(())
}

/// Distinct unit ids referenced by a batch, in first-occurrence order.
pub fn referenced_unit_ids(candidates: &[AssignmentCandidate]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .map(|candidate| candidate.unit_id)
        .filter(|unit_id| seen.insert(*unit_id))
        .collect()
}

/// Find the first DO unit claimed by more than one user within a batch.
///
/// `units` must contain the rows for the batch's unit ids; ids without a
/// row are ignored here. Groups are reported in the order their unit
/// first appears in `candidates`. A user listed twice for the same unit
/// counts once.
pub fn find_batch_conflict(
    candidates: &[AssignmentCandidate],
    units: &[Unit],
) -> Option<AssignmentConflict> {
    let do_units: HashMap<Uuid, &Unit> = units
        .iter()
        .filter(|unit| unit.is_do_unit())
        .map(|unit| (unit.id, unit))
        .collect();

    let mut first_seen: Vec<Uuid> = Vec::new();
    let mut claimants: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

    for candidate in candidates {
        if !do_units.contains_key(&candidate.unit_id) {
            continue;
        }

        let users = claimants.entry(candidate.unit_id).or_insert_with(|| {
            first_seen.push(candidate.unit_id);
            Vec::new()
        });
        if !users.contains(&candidate.user_id) {
            users.push(candidate.user_id);
        }
    }

    first_seen.into_iter().find_map(|unit_id| {
        let attempted = claimants.get(&unit_id).map_or(0, Vec::len);
        let unit = do_units.get(&unit_id)?;
        (attempted > 1).then(|| AssignmentConflict::BatchDuplicate {
            unit_name: unit.full_name.clone(),
            attempted,
        })
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn unit(full_name: &str) -> Unit {
        let now = Utc::now();
        Unit {
            id: Uuid::new_v4(),
            code: full_name.replace('/', "-"),
            full_name: full_name.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn candidate(user_id: Uuid, unit: &Unit) -> AssignmentCandidate {
        AssignmentCandidate {
            user_id,
            unit_id: unit.id,
            role: UserRole::Encoder,
        }
    }

    #[test]
    fn test_two_users_for_one_do_unit_conflict() {
        let do_unit = unit("CPMSD/DO");
        let batch = [
            candidate(Uuid::new_v4(), &do_unit),
            candidate(Uuid::new_v4(), &do_unit),
        ];

        let conflict = find_batch_conflict(&batch, &[do_unit]).unwrap();
        assert_eq!(
            conflict,
            AssignmentConflict::BatchDuplicate {
                unit_name: "CPMSD/DO".to_string(),
                attempted: 2,
            }
        );
        assert_eq!(
            conflict.to_string(),
            "Bulk approval failed: CPMSD/DO can only have one approved user."
        );
    }

    #[test]
    fn test_non_do_unit_allows_many() {
        let records = unit("CPMSD/RECORDS");
        let batch = [
            candidate(Uuid::new_v4(), &records),
            candidate(Uuid::new_v4(), &records),
            candidate(Uuid::new_v4(), &records),
        ];

        assert!(find_batch_conflict(&batch, &[records]).is_none());
    }

    #[test]
    fn test_distinct_do_units_do_not_conflict() {
        let first = unit("CPMSD/DO");
        let second = unit("FINANCE/DO");
        let batch = [
            candidate(Uuid::new_v4(), &first),
            candidate(Uuid::new_v4(), &second),
        ];

        assert!(find_batch_conflict(&batch, &[first, second]).is_none());
    }

    #[test]
    fn test_first_conflicting_unit_in_input_order_wins() {
        let finance = unit("FINANCE/DO");
        let cpmsd = unit("CPMSD/DO");
        let batch = [
            candidate(Uuid::new_v4(), &finance),
            candidate(Uuid::new_v4(), &cpmsd),
            candidate(Uuid::new_v4(), &cpmsd),
            candidate(Uuid::new_v4(), &finance),
        ];

        // Units passed in a different order than they appear in the batch.
        let conflict = find_batch_conflict(&batch, &[cpmsd, finance]).unwrap();
        assert_eq!(conflict.unit_name(), Some("FINANCE/DO"));
    }

    #[test]
    fn test_same_user_twice_is_one_claimant() {
        let do_unit = unit("CPMSD/DO");
        let user_id = Uuid::new_v4();
        let batch = [candidate(user_id, &do_unit), candidate(user_id, &do_unit)];

        assert!(find_batch_conflict(&batch, &[do_unit]).is_none());
    }

    #[test]
    fn test_lowercase_stored_name_still_classified() {
        let do_unit = unit("cpmsd/do");
        let batch = [
            candidate(Uuid::new_v4(), &do_unit),
            candidate(Uuid::new_v4(), &do_unit),
        ];

        assert!(find_batch_conflict(&batch, &[do_unit]).is_some());
    }

    #[test]
    fn test_referenced_unit_ids_are_distinct_in_order() {
        let first = unit("A/DO");
        let second = unit("B/DO");
        let batch = [
            candidate(Uuid::new_v4(), &second),
            candidate(Uuid::new_v4(), &first),
            candidate(Uuid::new_v4(), &second),
        ];

        assert_eq!(referenced_unit_ids(&batch), vec![second.id, first.id]);
    }

    #[test]
    fn test_validate_batch_rejects_empty_and_pending() {
        assert!(matches!(
            validate_batch(&[]),
            Err(DomainError::Field { field: FIELD_USERS, .. })
        ));

        let records = unit("CPMSD/RECORDS");
        let mut pending = candidate(Uuid::new_v4(), &records);
        pending.role = UserRole::Pending;
        assert!(validate_batch(&[pending]).is_err());

        assert!(validate_batch(&[candidate(Uuid::new_v4(), &records)]).is_ok());
    }

    #[test]
    fn test_assignment_marks_exclusive_only_for_live_do_holder() {
        let do_unit = unit("CPMSD/DO");
        let records = unit("CPMSD/RECORDS");

        let live = Assignment::new(UserRole::Clerk, Some(&do_unit));
        assert_eq!(live.unit_id, Some(do_unit.id));
        assert_eq!(live.exclusive_unit_id, Some(do_unit.id));

        let pending = Assignment::new(UserRole::Pending, Some(&do_unit));
        assert_eq!(pending.unit_id, Some(do_unit.id));
        assert_eq!(pending.exclusive_unit_id, None);

        let shared = Assignment::new(UserRole::Clerk, Some(&records));
        assert_eq!(shared.exclusive_unit_id, None);

        let unassigned = Assignment::new(UserRole::Viewer, None);
        assert_eq!(unassigned.unit_id, None);
        assert_eq!(unassigned.exclusive_unit_id, None);
    }
}
