//! User service - account maintenance, approvals and unit assignment.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::assignment::{self, AssignmentStore};
use crate::infra::{TransactionContext, UnitOfWork};
use crate::repository::{NewUser, ProfileFields, UserPage};
use common::{AppError, AppResult};
use domain::{
    validate_batch, ApproveUser, Assignment, AssignmentCandidate, BatchOutcome, CreateUser,
    Password, RegisterUser, Unit, UpdateUser, User, UserRole, FIELD_ROLE, FIELD_UNIT_ID,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// One page of users ordered by name, with the total count
    async fn list_users(&self, page: UserPage) -> AppResult<(Vec<User>, u64)>;

    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Self-registration; the account waits in the pending queue
    async fn register_user(&self, input: RegisterUser) -> AppResult<User>;

    /// Admin creation with an optional role and unit
    async fn create_user(&self, input: CreateUser) -> AppResult<User>;

    /// Full profile update, including role and unit
    async fn update_user(&self, id: Uuid, input: UpdateUser) -> AppResult<User>;

    async fn reset_password(&self, id: Uuid, password: String) -> AppResult<()>;

    /// Give one user a live role and a unit
    async fn approve_user(&self, id: Uuid, input: ApproveUser) -> AppResult<User>;

    /// Approve many pending users at once, all or nothing
    async fn bulk_approve(&self, candidates: Vec<AssignmentCandidate>) -> AppResult<BatchOutcome>;

    /// Delete the listed users; unknown ids are ignored
    async fn bulk_reject(&self, ids: Vec<Uuid>) -> AppResult<u64>;

    /// Delete a user on behalf of `actor_id`, who may not delete themselves
    async fn delete_user(&self, actor_id: Uuid, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Finish an assignment transaction, naming the holder when the
    /// exclusivity index stopped a concurrent second assignment.
    async fn settle<T: Send>(&self, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                let users = self.uow.users();
                let units = self.uow.units();
                Err(assignment::explain_contention(users.as_ref(), units.as_ref(), err).await)
            }
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn list_users(&self, page: UserPage) -> AppResult<(Vec<User>, u64)> {
        self.uow.users().list(page).await
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn register_user(&self, input: RegisterUser) -> AppResult<User> {
        let password_hash = Password::new(&input.password)?.into_string();
        let new_user = NewUser {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            password_hash,
            name: input.name,
            assignment: Assignment::new(UserRole::Pending, None),
        };

        let user = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    ensure_unique(&ctx, &new_user.username, &new_user.email, None).await?;
                    ctx.users().create(new_user).await
                })
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn create_user(&self, input: CreateUser) -> AppResult<User> {
        let password_hash = Password::new(&input.password)?.into_string();
        let id = Uuid::new_v4();
        let role = input.role.unwrap_or_default();

        let result = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move {
                    ensure_unique(&ctx, &input.username, &input.email, None).await?;
                    let unit = resolve_unit(&ctx, id, role, input.unit_id).await?;

                    ctx.users()
                        .create(NewUser {
                            id,
                            username: input.username,
                            email: input.email,
                            password_hash,
                            name: input.name,
                            assignment: Assignment::new(role, unit.as_ref()),
                        })
                        .await
                })
            })
            .await;
        let user = self.settle(result).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, input: UpdateUser) -> AppResult<User> {
        let result = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move {
                    if ctx.users().find_by_id(id).await?.is_none() {
                        return Err(AppError::NotFound);
                    }
                    ensure_unique(&ctx, &input.username, &input.email, Some(id)).await?;
                    let unit = resolve_unit(&ctx, id, input.role, input.unit_id).await?;

                    let profile = ProfileFields {
                        username: input.username,
                        email: input.email,
                        name: input.name,
                    };
                    ctx.users()
                        .update_profile(id, profile, Assignment::new(input.role, unit.as_ref()))
                        .await
                })
            })
            .await;
        let user = self.settle(result).await?;

        tracing::info!(user_id = %id, role = %user.role, "User updated");
        Ok(user)
    }

    async fn reset_password(&self, id: Uuid, password: String) -> AppResult<()> {
        let password_hash = Password::new(&password)?.into_string();
        self.uow.users().set_password(id, password_hash).await?;

        tracing::info!(user_id = %id, "Password reset");
        Ok(())
    }

    async fn approve_user(&self, id: Uuid, input: ApproveUser) -> AppResult<User> {
        if input.role.is_pending() {
            return Err(AppError::field(
                FIELD_ROLE,
                "Approved users need a role other than pending.",
            ));
        }

        let result = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move {
                    if ctx.find_user(id).await?.is_none() {
                        return Err(AppError::NotFound);
                    }
                    let unit = resolve_unit(&ctx, id, input.role, Some(input.unit_id)).await?;

                    ctx.assign(id, Assignment::new(input.role, unit.as_ref())).await
                })
            })
            .await;
        let user = self.settle(result).await?;

        tracing::info!(user_id = %id, unit_id = %input.unit_id, "User approved");
        Ok(user)
    }

    async fn bulk_approve(&self, candidates: Vec<AssignmentCandidate>) -> AppResult<BatchOutcome> {
        validate_batch(&candidates)?;
        assignment::detect_batch_conflicts(self.uow.units().as_ref(), &candidates).await?;

        let result = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move { assignment::apply_batch(&ctx, &candidates).await })
            })
            .await;
        let outcome = self.settle(result).await?;

        tracing::info!(
            applied = outcome.applied.len(),
            skipped = outcome.skipped.len(),
            "Bulk approval committed"
        );
        Ok(outcome)
    }

    async fn bulk_reject(&self, ids: Vec<Uuid>) -> AppResult<u64> {
        let requested = ids.len();
        let removed = self.uow.users().delete_many(ids).await?;

        tracing::info!(requested, removed, "Bulk rejection");
        Ok(removed)
    }

    async fn delete_user(&self, actor_id: Uuid, id: Uuid) -> AppResult<()> {
        if actor_id == id {
            tracing::warn!(user_id = %id, "Refused self-deletion");
            return Err(AppError::validation("You cannot delete your own account."));
        }

        self.uow.users().delete(id).await?;

        tracing::info!(user_id = %id, actor_id = %actor_id, "User deleted");
        Ok(())
    }
}

/// Username and email must be free, ignoring the user being edited.
async fn ensure_unique(
    ctx: &TransactionContext<'_>,
    username: &str,
    email: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    if ctx.users().find_by_username(username, exclude).await?.is_some() {
        return Err(AppError::conflict("Username"));
    }
    if ctx.users().find_by_email(email, exclude).await?.is_some() {
        return Err(AppError::conflict("Email"));
    }
    Ok(())
}

/// Load the target unit for `user_id`, running the availability guard when
/// the resulting role is live.
async fn resolve_unit(
    ctx: &TransactionContext<'_>,
    user_id: Uuid,
    role: UserRole,
    unit_id: Option<Uuid>,
) -> AppResult<Option<Unit>> {
    let Some(unit_id) = unit_id else {
        return Ok(None);
    };

    let unit = if role.is_live() {
        assignment::check_available(ctx, unit_id, user_id, Some(user_id)).await?
    } else {
        ctx.find_unit(unit_id).await?
    };

    let unit =
        unit.ok_or_else(|| AppError::field(FIELD_UNIT_ID, "The selected unit does not exist."))?;
    Ok(Some(unit))
}
