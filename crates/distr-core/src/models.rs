//! Domain models for distr.
//!
//! These are the core types shared across all crates.

pub mod credentials;
pub mod deployment;
pub mod organisation;
pub mod resource;
pub mod service;
pub mod status;
pub mod system;
pub mod value;
