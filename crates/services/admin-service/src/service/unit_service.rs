//! Unit service - maintenance of organizational units.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::infra::{TransactionContext, UnitOfWork};
use crate::repository::UnitFields;
use common::{AppError, AppResult};
use domain::{is_do_unit, parse_full_name, CreateUnit, Unit, UpdateUnit, FIELD_FULL_NAME};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Unit service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UnitService: Send + Sync {
    /// All units ordered by full name
    async fn list_units(&self, active_only: bool) -> AppResult<Vec<Unit>>;

    async fn get_unit(&self, id: Uuid) -> AppResult<Unit>;

    async fn create_unit(&self, input: CreateUnit) -> AppResult<Unit>;

    /// Partial update; omitted fields keep their value
    async fn update_unit(&self, id: Uuid, input: UpdateUnit) -> AppResult<Unit>;

    /// Delete a unit nobody references
    async fn delete_unit(&self, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of UnitService using Unit of Work.
pub struct UnitManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> UnitManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> UnitService for UnitManager<U> {
    async fn list_units(&self, active_only: bool) -> AppResult<Vec<Unit>> {
        self.uow.units().list(active_only).await
    }

    async fn get_unit(&self, id: Uuid) -> AppResult<Unit> {
        self.uow
            .units()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn create_unit(&self, input: CreateUnit) -> AppResult<Unit> {
        let fields = UnitFields {
            code: parse_code(&input.code)?,
            full_name: parse_full_name(&input.full_name)?,
            is_active: input.is_active.unwrap_or(true),
        };

        let unit = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    ensure_unique(&ctx, &fields, None).await?;
                    ctx.units().create(fields).await
                })
            })
            .await?;

        tracing::info!(unit_id = %unit.id, full_name = %unit.full_name, "Unit created");
        Ok(unit)
    }

    async fn update_unit(&self, id: Uuid, input: UpdateUnit) -> AppResult<Unit> {
        let code = input.code.as_deref().map(parse_code).transpose()?;
        let full_name = input.full_name.as_deref().map(parse_full_name).transpose()?;

        let unit = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move {
                    let existing = ctx.units().find_by_id(id).await?.ok_or(AppError::NotFound)?;
                    let fields = UnitFields {
                        code: code.unwrap_or_else(|| existing.code.clone()),
                        full_name: full_name.unwrap_or_else(|| existing.full_name.clone()),
                        is_active: input.is_active.unwrap_or(existing.is_active),
                    };
                    ensure_unique(&ctx, &fields, Some(id)).await?;

                    let was_do = existing.is_do_unit();
                    let now_do = is_do_unit(Some(fields.full_name.as_str()));
                    if now_do && !was_do {
                        let holders = ctx.users().count_live_holders(id).await?;
                        if holders > 1 {
                            return Err(AppError::field(
                                FIELD_FULL_NAME,
                                format!(
                                    "The unit has {} approved users; a DO unit can only have one.",
                                    holders
                                ),
                            ));
                        }
                    }

                    let unit = ctx.units().update(id, fields).await?;
                    if now_do != was_do {
                        ctx.users().mark_live_holders(id, now_do).await?;
                    }
                    Ok(unit)
                })
            })
            .await?;

        tracing::info!(unit_id = %id, full_name = %unit.full_name, "Unit updated");
        Ok(unit)
    }

    async fn delete_unit(&self, id: Uuid) -> AppResult<()> {
        let assigned = self.uow.users().count_by_unit(id).await?;
        if assigned > 0 {
            tracing::warn!(unit_id = %id, assigned, "Refused to delete a unit in use");
            return Err(AppError::validation(format!(
                "The unit is still assigned to {} user(s).",
                assigned
            )));
        }

        self.uow.units().delete(id).await?;

        tracing::info!(unit_id = %id, "Unit deleted");
        Ok(())
    }
}

fn parse_code(code: &str) -> AppResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::field("code", "The unit code is required."));
    }
    Ok(code.to_string())
}

async fn ensure_unique(
    ctx: &TransactionContext<'_>,
    fields: &UnitFields,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    if ctx.units().find_by_code(&fields.code, exclude).await?.is_some() {
        return Err(AppError::conflict("Unit code"));
    }
    if ctx
        .units()
        .find_by_full_name(&fields.full_name, exclude)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("Unit full name"));
    }
    Ok(())
}
