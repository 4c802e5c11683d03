//! Repository layer for data access.

pub mod entities;
pub(crate) mod unit_repository;
pub(crate) mod user_repository;

pub use unit_repository::{UnitFields, UnitRepository, UnitStore};
pub use user_repository::{NewUser, ProfileFields, UserPage, UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use unit_repository::MockUnitRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
