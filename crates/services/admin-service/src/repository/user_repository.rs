//! User repository implementation.
//!
//! Queries are written once as free functions over any [`ConnectionTrait`]
//! and shared by [`UserStore`] (pooled connection) and the
//! transaction-bound repository in `infra::unit_of_work`.

use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::{Assignment, AssignmentConflict, User, UserRole, LIVE_ROLES};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Column values for a new user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub assignment: Assignment,
}

/// Identity fields written by a full profile update.
#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub username: String,
    pub email: String,
    pub name: String,
}

/// Filter and page for user listings.
#[derive(Debug, Clone, Copy)]
pub struct UserPage {
    /// 1-indexed
    pub page: u64,
    pub per_page: u64,
    pub role: Option<UserRole>,
}

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// List one page of users ordered by name, with the total match count
    async fn list(&self, page: UserPage) -> AppResult<(Vec<User>, u64)>;

    /// Replace the stored password hash
    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<()>;

    /// Delete a user permanently
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Delete every listed user that exists; returns the number removed
    async fn delete_many(&self, ids: Vec<Uuid>) -> AppResult<u64>;

    /// Count users referencing a unit, pending or not
    async fn count_by_unit(&self, unit_id: Uuid) -> AppResult<u64>;

    /// User whose row carries the exclusivity marker for the unit
    async fn find_exclusive_holder(&self, unit_id: Uuid) -> AppResult<Option<User>>;
}

/// Concrete implementation of UserRepository over the connection pool
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(&self.db, id).await
    }

    async fn list(&self, page: UserPage) -> AppResult<(Vec<User>, u64)> {
        list(&self.db, page).await
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        set_password(&self.db, id, password_hash).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        delete(&self.db, id).await
    }

    async fn delete_many(&self, ids: Vec<Uuid>) -> AppResult<u64> {
        delete_many(&self.db, ids).await
    }

    async fn count_by_unit(&self, unit_id: Uuid) -> AppResult<u64> {
        count_by_unit(&self.db, unit_id).await
    }

    async fn find_exclusive_holder(&self, unit_id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::ExclusiveUnitId.eq(unit_id))
            .one(&self.db)
            .await?;
        Ok(result.map(User::from))
    }
}

// =============================================================================
// Shared queries
// =============================================================================

pub(crate) async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Option<User>> {
    let result = UserEntity::find_by_id(id).one(conn).await?;
    Ok(result.map(User::from))
}

/// Find a user by username, ignoring `exclude` (the user being edited).
pub(crate) async fn find_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    exclude: Option<Uuid>,
) -> AppResult<Option<User>> {
    let mut query = UserEntity::find().filter(user::Column::Username.eq(username));
    if let Some(id) = exclude {
        query = query.filter(user::Column::Id.ne(id));
    }

    Ok(query.one(conn).await?.map(User::from))
}

/// Find a user by email, ignoring `exclude` (the user being edited).
pub(crate) async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    exclude: Option<Uuid>,
) -> AppResult<Option<User>> {
    let mut query = UserEntity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = exclude {
        query = query.filter(user::Column::Id.ne(id));
    }

    Ok(query.one(conn).await?.map(User::from))
}

/// Any live user assigned to `unit_id` other than `exclude`.
pub(crate) async fn find_live_holder<C: ConnectionTrait>(
    conn: &C,
    unit_id: Uuid,
    exclude: Option<Uuid>,
) -> AppResult<Option<User>> {
    let mut query = UserEntity::find()
        .filter(user::Column::UnitId.eq(unit_id))
        .filter(user::Column::Role.is_in(LIVE_ROLES.iter().copied()));
    if let Some(id) = exclude {
        query = query.filter(user::Column::Id.ne(id));
    }

    let result = query
        .order_by_asc(user::Column::CreatedAt)
        .one(conn)
        .await?;
    Ok(result.map(User::from))
}

pub(crate) async fn count_live_holders<C: ConnectionTrait>(conn: &C, unit_id: Uuid) -> AppResult<u64> {
    let count = UserEntity::find()
        .filter(user::Column::UnitId.eq(unit_id))
        .filter(user::Column::Role.is_in(LIVE_ROLES.iter().copied()))
        .count(conn)
        .await?;
    Ok(count)
}

pub(crate) async fn count_by_unit<C: ConnectionTrait>(conn: &C, unit_id: Uuid) -> AppResult<u64> {
    let count = UserEntity::find()
        .filter(user::Column::UnitId.eq(unit_id))
        .count(conn)
        .await?;
    Ok(count)
}

pub(crate) async fn list<C: ConnectionTrait>(conn: &C, page: UserPage) -> AppResult<(Vec<User>, u64)> {
    let mut query = UserEntity::find();
    if let Some(role) = page.role {
        query = query.filter(user::Column::Role.eq(role.as_str()));
    }

    let paginator = query
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .paginate(conn, page.per_page);
    let total = paginator.num_items().await?;
    let models = paginator.fetch_page(page.page.saturating_sub(1)).await?;

    Ok((models.into_iter().map(User::from).collect(), total))
}

pub(crate) async fn insert<C: ConnectionTrait>(conn: &C, new_user: NewUser) -> AppResult<User> {
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(new_user.id),
        username: Set(new_user.username),
        email: Set(new_user.email),
        password_hash: Set(new_user.password_hash),
        name: Set(new_user.name),
        role: Set(new_user.assignment.role.to_string()),
        unit_id: Set(new_user.assignment.unit_id),
        exclusive_unit_id: Set(new_user.assignment.exclusive_unit_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let exclusive = new_user.assignment.exclusive_unit_id;
    let model = active_model
        .insert(conn)
        .await
        .map_err(|err| write_error(err, exclusive))?;
    Ok(User::from(model))
}

/// Write role, unit and the exclusivity marker.
pub(crate) async fn assign<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    assignment: Assignment,
) -> AppResult<User> {
    let user = UserEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = user.into();
    set_assignment(&mut active, assignment);
    active.updated_at = Set(chrono::Utc::now());

    let model = active
        .update(conn)
        .await
        .map_err(|err| write_error(err, assignment.exclusive_unit_id))?;
    Ok(User::from(model))
}

pub(crate) async fn update_profile<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    profile: ProfileFields,
    assignment: Assignment,
) -> AppResult<User> {
    let user = UserEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = user.into();
    active.username = Set(profile.username);
    active.email = Set(profile.email);
    active.name = Set(profile.name);
    set_assignment(&mut active, assignment);
    active.updated_at = Set(chrono::Utc::now());

    let model = active
        .update(conn)
        .await
        .map_err(|err| write_error(err, assignment.exclusive_unit_id))?;
    Ok(User::from(model))
}

/// Point the exclusivity marker of every live holder of `unit_id` at the
/// unit (`exclusive = true`) or clear it.
pub(crate) async fn mark_live_holders<C: ConnectionTrait>(
    conn: &C,
    unit_id: Uuid,
    exclusive: bool,
) -> AppResult<u64> {
    let marker = exclusive.then_some(unit_id);
    let result = UserEntity::update_many()
        .col_expr(user::Column::ExclusiveUnitId, Expr::value(marker))
        .filter(user::Column::UnitId.eq(unit_id))
        .filter(user::Column::Role.is_in(LIVE_ROLES.iter().copied()))
        .exec(conn)
        .await
        .map_err(|err| write_error(err, marker))?;
    Ok(result.rows_affected)
}

pub(crate) async fn set_password<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    password_hash: String,
) -> AppResult<()> {
    let user = UserEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(chrono::Utc::now());

    active.update(conn).await?;
    Ok(())
}

pub(crate) async fn delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<()> {
    let result = UserEntity::delete_by_id(id).exec(conn).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(())
}

pub(crate) async fn delete_many<C: ConnectionTrait>(conn: &C, ids: Vec<Uuid>) -> AppResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = UserEntity::delete_many()
        .filter(user::Column::Id.is_in(ids))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

fn set_assignment(active: &mut ActiveModel, assignment: Assignment) {
    active.role = Set(assignment.role.to_string());
    active.unit_id = Set(assignment.unit_id);
    active.exclusive_unit_id = Set(assignment.exclusive_unit_id);
}

/// Translate unique violations raised by user writes.
///
/// A collision on `exclusive_unit_id` means another transaction committed a
/// live holder for the same DO unit first. It is reported as
/// [`AssignmentConflict::Contended`] for the unit the write tried to mark.
pub(crate) fn write_error(err: DbErr, exclusive_unit_id: Option<Uuid>) -> AppError {
    match (err.sql_err(), exclusive_unit_id) {
        (Some(SqlErr::UniqueConstraintViolation(detail)), Some(unit_id))
            if detail.contains("exclusive_unit_id") =>
        {
            tracing::warn!(%unit_id, "Unique index rejected a second DO unit holder: {}", detail);
            AssignmentConflict::Contended { unit_id }.into()
        }
        (Some(SqlErr::UniqueConstraintViolation(_)), _) => AppError::conflict("User"),
        _ => AppError::Database(err),
    }
}
