//! Domain-level errors.
//!
//! These errors represent business rule violations and domain logic failures.
//! They are independent of infrastructure concerns (HTTP, database).

use thiserror::Error;
use uuid::Uuid;

use crate::constants::{FIELD_UNIT_ID, FIELD_USERS};

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed for an input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Validation failed for a named field
    #[error("{message}")]
    Field { field: &'static str, message: String },

    /// Password-related errors
    #[error("Password error: {0}")]
    Password(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists (conflict)
    #[error("{0} already exists")]
    Conflict(String),

    /// Internal domain error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Create a validation error keyed by field
    pub fn field(field: &'static str, msg: impl Into<String>) -> Self {
        DomainError::Field {
            field,
            message: msg.into(),
        }
    }

    /// Create a password error
    pub fn password(msg: impl Into<String>) -> Self {
        DomainError::Password(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>) -> Self {
        DomainError::NotFound(entity.into())
    }

    /// Create a conflict error
    pub fn conflict(entity: impl Into<String>) -> Self {
        DomainError::Conflict(entity.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }
}

/// Violation of the single-holder rule for DO units.
///
/// The display text is the user-facing message; [`AssignmentConflict::field`]
/// names the request field the message is reported under.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentConflict {
    /// The unit already has a live holder other than the candidate.
    #[error("The unit {unit_name} is already assigned to {holder_name}.")]
    UnitTaken {
        unit_name: String,
        holder_name: String,
    },

    /// One batch proposes several users for the same unit.
    #[error("Bulk approval failed: {unit_name} can only have one approved user.")]
    BatchDuplicate { unit_name: String, attempted: usize },

    /// The storage index refused a second live holder written by a
    /// concurrent transaction. Services replace this with [`UnitTaken`]
    /// once the winning holder can be read.
    ///
    /// [`UnitTaken`]: AssignmentConflict::UnitTaken
    #[error("The unit is already assigned to another approved user.")]
    Contended { unit_id: Uuid },
}

impl AssignmentConflict {
    /// Request field the conflict is reported under.
    pub fn field(&self) -> &'static str {
        match self {
            AssignmentConflict::UnitTaken { .. } | AssignmentConflict::Contended { .. } => {
                FIELD_UNIT_ID
            }
            AssignmentConflict::BatchDuplicate { .. } => FIELD_USERS,
        }
    }

    /// Full name of the contested unit, when it was known at detection.
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            AssignmentConflict::UnitTaken { unit_name, .. }
            | AssignmentConflict::BatchDuplicate { unit_name, .. } => Some(unit_name),
            AssignmentConflict::Contended { .. } => None,
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
