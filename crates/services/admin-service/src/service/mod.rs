//! Application services layer - use cases over the Unit of Work.
//!
//! Services depend on the [`crate::infra::UnitOfWork`] abstraction and are
//! exposed to handlers as trait objects.

mod unit_service;
mod user_service;

pub use unit_service::{UnitManager, UnitService};
pub use user_service::{UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use unit_service::MockUnitService;
#[cfg(any(test, feature = "test-utils"))]
pub use user_service::MockUserService;
