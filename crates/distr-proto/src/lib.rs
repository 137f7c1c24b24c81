//! distr schema loading and dynamic RPC clients.
//!
//! - [`schema`]: fetching service schemas and checking them against the
//!   shared contract.
//! - [`client`]: compiling a schema at runtime and talking to the service
//!   through a [`distr_core::contract::ContractClient`].

pub mod client;
pub mod codec;
pub mod schema;

pub use client::{ClientDefinition, GrpcClientFactory, GrpcContractClient, materialize_client};
pub use schema::{
    HttpSchemaFetcher, SchemaDescription, SchemaSource, extract_namespace, fetch_schema, validate,
};
