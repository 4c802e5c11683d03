//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! users, units, the DO-unit classifier and the storage-free half of the
//! single-holder rule.

pub mod assignment;
pub mod constants;
pub mod error;
pub mod password;
pub mod unit;
pub mod user;

pub use assignment::{
    find_batch_conflict, referenced_unit_ids, validate_batch, Assignment, AssignmentCandidate,
    BatchOutcome,
};
pub use constants::*;
pub use error::{AssignmentConflict, DomainError, DomainResult};
pub use password::Password;
pub use unit::{
    is_do_unit, normalize_full_name, parse_full_name, CreateUnit, Unit, UnitResponse, UpdateUnit,
};
pub use user::{
    ApproveUser, CreateUser, RegisterUser, UpdateUser, User, UserResponse, UserRole,
};
