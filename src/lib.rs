pub mod auth;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod use_cases;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
