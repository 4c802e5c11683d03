//! Unit of Work pattern implementation.
//!
//! Centralizes repository access and runs multi-step writes atomically.
//! Assignment writes use the serializable variant so the availability check
//! and the write see one consistent snapshot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait};
use uuid::Uuid;

use crate::assignment::AssignmentStore;
use crate::repository::{
    unit_repository, user_repository, NewUser, ProfileFields, UnitFields, UnitRepository,
    UnitStore, UserRepository, UserStore,
};
use common::{AppError, AppResult};
use domain::{Assignment, Unit, User};

/// Boxed future returned by transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because of the generic methods; services are
/// exercised against an in-memory database instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Get user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Get unit repository
    fn units(&self) -> Arc<dyn UnitRepository>;

    /// Execute a closure within a ReadCommitted transaction.
    ///
    /// Committed on success, rolled back on error.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;

    /// Execute a closure within a serializable transaction.
    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Repository access bound to one open transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Get user repository for this transaction
    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository { txn: self.txn }
    }

    /// Get unit repository for this transaction
    pub fn units(&self) -> TxUnitRepository<'_> {
        TxUnitRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    unit_repo: Arc<UnitStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        let user_repo = Arc::new(UserStore::new(db.clone()));
        let unit_repo = Arc::new(UnitStore::new(db.clone()));
        Self {
            db,
            user_repo,
            unit_repo,
        }
    }

    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn units(&self) -> Arc<dyn UnitRepository> {
        self.unit_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::ReadCommitted, f).await
    }

    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::Serializable, f).await
    }
}

/// Transaction-aware user repository.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        user_repository::find_by_id(self.txn, id).await
    }

    pub async fn find_by_username(&self, username: &str, exclude: Option<Uuid>) -> AppResult<Option<User>> {
        user_repository::find_by_username(self.txn, username, exclude).await
    }

    pub async fn find_by_email(&self, email: &str, exclude: Option<Uuid>) -> AppResult<Option<User>> {
        user_repository::find_by_email(self.txn, email, exclude).await
    }

    /// Number of non-pending users assigned to the unit
    pub async fn count_live_holders(&self, unit_id: Uuid) -> AppResult<u64> {
        user_repository::count_live_holders(self.txn, unit_id).await
    }

    pub async fn create(&self, new_user: NewUser) -> AppResult<User> {
        user_repository::insert(self.txn, new_user).await
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        profile: ProfileFields,
        assignment: Assignment,
    ) -> AppResult<User> {
        user_repository::update_profile(self.txn, id, profile, assignment).await
    }

    /// Recompute the exclusivity marker for every live holder of a unit
    pub async fn mark_live_holders(&self, unit_id: Uuid, exclusive: bool) -> AppResult<u64> {
        user_repository::mark_live_holders(self.txn, unit_id, exclusive).await
    }
}

/// Transaction-aware unit repository.
pub struct TxUnitRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUnitRepository<'a> {
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Unit>> {
        unit_repository::find_by_id(self.txn, id).await
    }

    pub async fn find_by_code(&self, code: &str, exclude: Option<Uuid>) -> AppResult<Option<Unit>> {
        unit_repository::find_by_code(self.txn, code, exclude).await
    }

    pub async fn find_by_full_name(
        &self,
        full_name: &str,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Unit>> {
        unit_repository::find_by_full_name(self.txn, full_name, exclude).await
    }

    pub async fn create(&self, fields: UnitFields) -> AppResult<Unit> {
        unit_repository::insert(self.txn, fields).await
    }

    pub async fn update(&self, id: Uuid, fields: UnitFields) -> AppResult<Unit> {
        unit_repository::update(self.txn, id, fields).await
    }
}

#[async_trait]
impl<'a> AssignmentStore for TransactionContext<'a> {
    async fn find_unit(&self, unit_id: Uuid) -> AppResult<Option<Unit>> {
        unit_repository::find_by_id(self.txn, unit_id).await
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        user_repository::find_by_id(self.txn, user_id).await
    }

    async fn find_live_holder(
        &self,
        unit_id: Uuid,
        exclude_user_id: Option<Uuid>,
    ) -> AppResult<Option<User>> {
        user_repository::find_live_holder(self.txn, unit_id, exclude_user_id).await
    }

    async fn assign(&self, user_id: Uuid, assignment: Assignment) -> AppResult<User> {
        user_repository::assign(self.txn, user_id, assignment).await
    }
}
