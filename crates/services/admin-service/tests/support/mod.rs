//! Shared fixtures: an in-memory SQLite database with migrations applied
//! and services wired over it.

#![allow(dead_code)]

use std::sync::Arc;

use admin_service_lib::infra::{Database, Persistence};
use admin_service_lib::service::{UnitManager, UnitService, UserManager, UserService};
use common::DatabaseConfig;
use domain::{ApproveUser, CreateUnit, CreateUser, RegisterUser, Unit, User, UserRole};

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub database: Arc<Database>,
    pub users: UserManager<Persistence>,
    pub units: UnitManager<Persistence>,
}

pub async fn setup() -> TestApp {
    let database = Database::connect(&DatabaseConfig::single("sqlite::memory:"))
        .await
        .expect("in-memory database");
    let uow = Arc::new(Persistence::new(database.get_connection()));

    TestApp {
        database: Arc::new(database),
        users: UserManager::new(uow.clone()),
        units: UnitManager::new(uow),
    }
}

impl TestApp {
    pub async fn unit(&self, full_name: &str) -> Unit {
        self.units
            .create_unit(CreateUnit {
                code: full_name.replace('/', "-"),
                full_name: full_name.to_string(),
                is_active: None,
            })
            .await
            .expect("unit created")
    }

    /// Self-registered user waiting in the pending queue
    pub async fn pending(&self, name: &str) -> User {
        let handle = name.to_lowercase();
        self.users
            .register_user(RegisterUser {
                username: handle.clone(),
                email: format!("{}@example.com", handle),
                password: PASSWORD.to_string(),
                name: name.to_string(),
            })
            .await
            .expect("user registered")
    }

    /// User already approved into `unit`
    pub async fn approved(&self, name: &str, unit: &Unit) -> User {
        let user = self.pending(name).await;
        self.users
            .approve_user(
                user.id,
                ApproveUser {
                    role: UserRole::Encoder,
                    unit_id: unit.id,
                },
            )
            .await
            .expect("user approved")
    }

    pub async fn create(&self, name: &str, role: UserRole, unit: Option<&Unit>) -> User {
        let handle = name.to_lowercase();
        self.users
            .create_user(CreateUser {
                username: handle.clone(),
                email: format!("{}@example.com", handle),
                password: PASSWORD.to_string(),
                name: name.to_string(),
                role: Some(role),
                unit_id: unit.map(|unit| unit.id),
            })
            .await
            .expect("user created")
    }

    pub async fn reload(&self, user: &User) -> User {
        self.users.get_user(user.id).await.expect("user exists")
    }
}
