//! Admin service configuration.

use std::env;

use common::{DatabaseConfig, ServiceConfig};

// =============================================================================
// Pagination
// =============================================================================

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed items per page
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

// =============================================================================
// Server
// =============================================================================

pub const SERVICE_NAME: &str = "admin-service";

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Header carrying the acting user's id, set by the authenticating proxy
pub const ACTOR_HEADER: &str = "x-user-id";

/// Admin service configuration.
#[derive(Debug, Clone)]
pub struct AdminServiceConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
}

impl AdminServiceConfig {
    /// Load configuration from environment variables (and `.env`).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: env::var("ADMIN_SERVICE_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .unwrap_or(defaults.url),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.max_connections),
            min_connections: env_parse("DATABASE_MIN_CONNECTIONS")
                .unwrap_or(defaults.min_connections),
        };

        let service = ServiceConfig {
            service_name: SERVICE_NAME.to_string(),
            host: env::var("ADMIN_SERVICE_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            port: env_parse("ADMIN_SERVICE_PORT").unwrap_or(DEFAULT_SERVER_PORT),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        Self { service, database }
    }

    /// Override the bind address (CLI flags win over the environment).
    pub fn with_addr(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.service.host = host;
        }
        if let Some(port) = port {
            self.service.port = port;
        }
        self
    }
}

impl Default for AdminServiceConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                service_name: SERVICE_NAME.to_string(),
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                log_level: "info".to_string(),
            },
            database: DatabaseConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
