//! User domain entity and related types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ROLE_ADMIN, ROLE_CLERK, ROLE_ENCODER, ROLE_PENDING, ROLE_VIEWER};
use crate::error::DomainError;

/// User roles enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Pending,
    Encoder,
    Viewer,
    Clerk,
    Admin,
}

impl UserRole {
    /// Pending users hold no live assignment.
    pub fn is_pending(&self) -> bool {
        matches!(self, UserRole::Pending)
    }

    /// A unit assignment counts toward the single-holder rule only for
    /// non-pending roles.
    pub fn is_live(&self) -> bool {
        !self.is_pending()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Pending => ROLE_PENDING,
            UserRole::Encoder => ROLE_ENCODER,
            UserRole::Viewer => ROLE_VIEWER,
            UserRole::Clerk => ROLE_CLERK,
            UserRole::Admin => ROLE_ADMIN,
        }
    }
}

/// Lenient conversion used when reading stored rows.
///
/// Unknown values fall back to `Pending`, which grants nothing and never
/// counts as a live assignment.
impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or(UserRole::Pending)
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_PENDING => Ok(UserRole::Pending),
            ROLE_ENCODER => Ok(UserRole::Encoder),
            ROLE_VIEWER => Ok(UserRole::Viewer),
            ROLE_CLERK => Ok(UserRole::Clerk),
            ROLE_ADMIN => Ok(UserRole::Admin),
            other => Err(DomainError::validation(format!("Invalid role '{}'", other))),
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    /// Weak reference to the assigned unit
    pub unit_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new pending user without a unit
    pub fn new(id: Uuid, username: String, email: String, password_hash: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            email,
            password_hash,
            name,
            role: UserRole::Pending,
            unit_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if user is awaiting approval
    pub fn is_pending(&self) -> bool {
        self.role.is_pending()
    }

    /// Check if user holds a live assignment to the given unit
    pub fn holds(&self, unit_id: Uuid) -> bool {
        self.role.is_live() && self.unit_id == Some(unit_id)
    }
}

/// Self-registration data (always lands in the pending queue)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Admin user creation data
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
    /// Defaults to pending when omitted
    pub role: Option<UserRole>,
    pub unit_id: Option<Uuid>,
}

/// Full profile update; every field is written
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub unit_id: Option<Uuid>,
}

/// Single approval of a registration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApproveUser {
    pub role: UserRole,
    pub unit_id: Uuid,
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Display name
    pub name: String,
    pub role: UserRole,
    /// Assigned unit, if any
    pub unit_id: Option<Uuid>,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            role: user.role,
            unit_id: user.unit_id,
            created_at: user.created_at,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse::from(user.clone())
    }
}
