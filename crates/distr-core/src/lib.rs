//! distr core: domain models, the remote service contract, repository
//! traits and the shared error type.

pub mod contract;
pub mod error;
pub mod models;
pub mod repository;
