//! Unit repository implementation.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use super::entities::unit::{self, ActiveModel, Entity as UnitEntity};
use common::{AppError, AppResult};
use domain::Unit;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Column values written when creating or editing a unit.
#[derive(Debug, Clone)]
pub struct UnitFields {
    pub code: String,
    pub full_name: String,
    pub is_active: bool,
}

/// Unit repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Unit>>;

    /// Load every unit whose id is listed; missing ids are simply absent
    async fn find_by_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<Unit>>;

    /// List units ordered by full name
    async fn list(&self, active_only: bool) -> AppResult<Vec<Unit>>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of UnitRepository over the connection pool
pub struct UnitStore {
    db: DatabaseConnection,
}

impl UnitStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UnitRepository for UnitStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Unit>> {
        find_by_id(&self.db, id).await
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<Unit>> {
        find_by_ids(&self.db, ids).await
    }

    async fn list(&self, active_only: bool) -> AppResult<Vec<Unit>> {
        let mut query = UnitEntity::find();
        if active_only {
            query = query.filter(unit::Column::IsActive.eq(true));
        }

        let models = query
            .order_by_asc(unit::Column::FullName)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Unit::from).collect())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = UnitEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(write_error)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}

// =============================================================================
// Shared queries
// =============================================================================

pub(crate) async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Option<Unit>> {
    let result = UnitEntity::find_by_id(id).one(conn).await?;
    Ok(result.map(Unit::from))
}

pub(crate) async fn find_by_ids<C: ConnectionTrait>(conn: &C, ids: Vec<Uuid>) -> AppResult<Vec<Unit>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let models = UnitEntity::find()
        .filter(unit::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(models.into_iter().map(Unit::from).collect())
}

/// Find a unit by code, ignoring `exclude` (the unit being edited).
pub(crate) async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    exclude: Option<Uuid>,
) -> AppResult<Option<Unit>> {
    let mut query = UnitEntity::find().filter(unit::Column::Code.eq(code));
    if let Some(id) = exclude {
        query = query.filter(unit::Column::Id.ne(id));
    }

    Ok(query.one(conn).await?.map(Unit::from))
}

/// Find a unit by normalized full name, ignoring `exclude`.
pub(crate) async fn find_by_full_name<C: ConnectionTrait>(
    conn: &C,
    full_name: &str,
    exclude: Option<Uuid>,
) -> AppResult<Option<Unit>> {
    let mut query = UnitEntity::find().filter(unit::Column::FullName.eq(full_name));
    if let Some(id) = exclude {
        query = query.filter(unit::Column::Id.ne(id));
    }

    Ok(query.one(conn).await?.map(Unit::from))
}

pub(crate) async fn insert<C: ConnectionTrait>(conn: &C, fields: UnitFields) -> AppResult<Unit> {
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(fields.code),
        full_name: Set(fields.full_name),
        is_active: Set(fields.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active_model.insert(conn).await.map_err(write_error)?;
    Ok(Unit::from(model))
}

pub(crate) async fn update<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    fields: UnitFields,
) -> AppResult<Unit> {
    let model = UnitEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = model.into();
    active.code = Set(fields.code);
    active.full_name = Set(fields.full_name);
    active.is_active = Set(fields.is_active);
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(conn).await.map_err(write_error)?;
    Ok(Unit::from(model))
}

fn write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("Unit"),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            AppError::validation("The unit is still assigned to users.")
        }
        _ => AppError::Database(err),
    }
}
