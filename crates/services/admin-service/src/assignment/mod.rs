//! Enforcement of the single-holder rule for DO units.
//!
//! Three stages share one storage port:
//! - [`guard`] checks a single (user, unit) assignment against stored state
//! - [`detector`] rejects a batch that claims one DO unit for several users
//! - [`applier`] writes a validated batch inside one transaction
//!
//! [`explain_contention`] names the holder when the storage index, rather
//! than the guard, stopped a concurrent second assignment.
//!
//! The guard and applier are authoritative only when the store is a
//! transaction; the detector runs before the transaction opens.

pub mod applier;
pub mod detector;
pub mod guard;

use async_trait::async_trait;
use uuid::Uuid;

use common::AppResult;
use domain::{Assignment, Unit, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

pub use applier::apply_batch;
pub use detector::detect_batch_conflicts;
pub use guard::{check_available, explain_contention};

/// Reads and writes the assignment stages need.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn find_unit(&self, unit_id: Uuid) -> AppResult<Option<Unit>>;

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Any non-pending user assigned to the unit, other than `exclude_user_id`
    async fn find_live_holder(
        &self,
        unit_id: Uuid,
        exclude_user_id: Option<Uuid>,
    ) -> AppResult<Option<User>>;

    /// Persist role, unit and exclusivity marker for one user
    async fn assign(&self, user_id: Uuid, assignment: Assignment) -> AppResult<User>;
}
