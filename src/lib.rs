pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod report;
pub mod repository;
pub mod schema;

pub use app::create_router;
pub use error::InventoryError;
pub use repository::Repository;
