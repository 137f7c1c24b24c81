//! Vault error types.

use distr_core::error::DistrError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The packed `ciphertext|iv` string is malformed.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Key derivation failed, or authentication of the ciphertext failed.
    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<VaultError> for DistrError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Decoding(msg) => DistrError::Decoding(msg),
            VaultError::Crypto(msg) => DistrError::Crypto(msg),
        }
    }
}
