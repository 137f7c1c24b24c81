//! distr database layer: SurrealDB connection management, schema
//! migrations and implementations of the `distr-core` repository traits.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::run_migrations;
