//! distr orchestration layer.
//!
//! - [`registry::ServiceRegistry`] admits services after checking their
//!   schema, hands out live connections and blocks services that stop
//!   satisfying the contract.
//! - [`connection::ServiceConnection`] wraps a live client with the
//!   credentials of one deployment.
//! - [`orchestrator::ResourceOrchestrator`] drives resource lifecycles and
//!   deployment/system cascades against those connections.

pub mod config;
pub mod connection;
pub mod orchestrator;
pub mod registry;

pub use config::RegistryConfig;
pub use connection::ServiceConnection;
pub use orchestrator::{CascadeReport, RemoteOutcome, ResourceDeletion, ResourceOrchestrator};
pub use registry::{RevalidationReport, ServiceConnector, ServiceRegistry, revalidation_loop};
