//! Application state - dependency injection container.

use std::sync::Arc;

use crate::infra::{Database, Persistence};
use crate::service::{UnitManager, UnitService, UserManager, UserService};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserService>,
    pub unit_service: Arc<dyn UnitService>,
    /// Database handle, used by the health check
    pub database: Arc<Database>,
}

impl AppState {
    /// Wire services over one Unit of Work on the given database.
    pub fn from_database(database: Arc<Database>) -> Self {
        let uow = Arc::new(Persistence::new(database.get_connection()));

        Self {
            user_service: Arc::new(UserManager::new(uow.clone())),
            unit_service: Arc::new(UnitManager::new(uow)),
            database,
        }
    }

    /// Create state with manually injected services.
    pub fn new(
        user_service: Arc<dyn UserService>,
        unit_service: Arc<dyn UnitService>,
        database: Arc<Database>,
    ) -> Self {
        Self {
            user_service,
            unit_service,
            database,
        }
    }
}
