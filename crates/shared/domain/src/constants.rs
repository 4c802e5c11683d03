//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Role of a registered user awaiting approval
pub const ROLE_PENDING: &str = "pending";

/// Data entry role
pub const ROLE_ENCODER: &str = "encoder";

/// Read-only role
pub const ROLE_VIEWER: &str = "viewer";

/// Records clerk role
pub const ROLE_CLERK: &str = "clerk";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

/// Stored role values that count toward the single-holder rule.
///
/// Queries filter on this closed set so a row with an unrecognized role
/// is treated as pending in SQL exactly as it is when read into
/// [`crate::UserRole`].
pub const LIVE_ROLES: &[&str] = &[ROLE_ENCODER, ROLE_VIEWER, ROLE_CLERK, ROLE_ADMIN];

// =============================================================================
// Units
// =============================================================================

/// Suffix that designates a unit as single-holder
pub const DO_UNIT_SUFFIX: &str = "/DO";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Field keys for validation failures
// =============================================================================

/// Field key used for single assignment failures
pub const FIELD_UNIT_ID: &str = "unit_id";

/// Field key used for batch approval failures
pub const FIELD_USERS: &str = "users";

/// Field key used for unit name failures
pub const FIELD_FULL_NAME: &str = "full_name";

/// Field key used for role failures
pub const FIELD_ROLE: &str = "role";
