//! distr credential vault.
//!
//! Encrypts the secret fields of deployment credentials with AES-256-GCM
//! under a key derived from a configured passphrase. Performs no I/O.

pub mod cipher;
pub mod config;
pub mod error;

pub use cipher::Vault;
pub use config::VaultConfig;
pub use error::VaultError;
