//! HTTP request handlers.

pub mod health_handler;
pub mod unit_handler;
pub mod user_handler;

pub use health_handler::health;
pub use unit_handler::unit_routes;
pub use user_handler::user_routes;
