//! AES-256-GCM encryption of credential secrets.
//!
//! Ciphertext is packed as `base64(ciphertext || tag)|base64(nonce)`.

use std::collections::BTreeMap;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use distr_core::models::credentials::{
    AwsCredentials, AzureCredentials, Credentials, OtherCredentials, SealedCredentials,
};
use distr_core::models::deployment::Deployment;

use crate::config::VaultConfig;
use crate::error::VaultError;

const NONCE_LEN: usize = 12;
const SEPARATOR: char = '|';

/// Holds the derived key in memory for the lifetime of the process.
#[derive(Clone)]
pub struct Vault {
    key: [u8; 32],
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

impl Vault {
    /// Derives the key from the configured passphrase and salt with
    /// Argon2id. Deterministic: the same config always yields the same key.
    pub fn new(config: &VaultConfig) -> Result<Self, VaultError> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(
                config.passphrase.as_bytes(),
                config.salt.as_bytes(),
                &mut key,
            )
            .map_err(|e| VaultError::Crypto(format!("key derivation: {e}")))?;
        Ok(Self { key })
    }

    /// Builds a vault from raw key bytes.
    pub fn from_key(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Crypto(format!("AES-GCM encrypt: {e}")))?;

        Ok(format!(
            "{}{SEPARATOR}{}",
            STANDARD.encode(ciphertext),
            STANDARD.encode(nonce_bytes)
        ))
    }

    pub fn decrypt(&self, packed: &str) -> Result<String, VaultError> {
        let (ciphertext, iv) = packed
            .split_once(SEPARATOR)
            .ok_or_else(|| VaultError::Decoding("IV not found".into()))?;
        if iv.is_empty() {
            return Err(VaultError::Decoding("IV not found".into()));
        }

        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|e| VaultError::Decoding(format!("ciphertext base64: {e}")))?;
        let nonce_bytes = STANDARD
            .decode(iv)
            .map_err(|e| VaultError::Decoding(format!("IV base64: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(VaultError::Decoding(format!(
                "IV must be {NONCE_LEN} bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| VaultError::Crypto(format!("AES-GCM decrypt: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| VaultError::Decoding(format!("plaintext is not UTF-8: {e}")))
    }

    /// Encrypts the secret fields of whichever variant is populated.
    /// Identifiers (AWS key id and region, Azure tenant and client) stay
    /// readable.
    pub fn seal(&self, credentials: &Credentials) -> Result<SealedCredentials, VaultError> {
        let sealed = map_secrets(credentials, |secret| self.encrypt(secret))?;
        Ok(SealedCredentials::from_ciphertext(sealed))
    }

    pub fn unseal(&self, sealed: &SealedCredentials) -> Result<Credentials, VaultError> {
        map_secrets(sealed.as_ciphertext(), |secret| self.decrypt(secret))
    }

    /// Plaintext credentials for a deployment, of the variant it stored.
    pub fn credentials_for(&self, deployment: &Deployment) -> Result<Credentials, VaultError> {
        self.unseal(&deployment.credentials)
    }
}

fn map_secrets<F>(credentials: &Credentials, f: F) -> Result<Credentials, VaultError>
where
    F: Fn(&str) -> Result<String, VaultError>,
{
    Ok(match credentials {
        Credentials::Aws(aws) => Credentials::Aws(AwsCredentials {
            id: aws.id.clone(),
            secret: f(&aws.secret)?,
            region: aws.region.clone(),
        }),
        Credentials::Azure(azure) => Credentials::Azure(AzureCredentials {
            tenant_id: azure.tenant_id.clone(),
            client_id: azure.client_id.clone(),
            secret: f(&azure.secret)?,
        }),
        Credentials::Other(other) => {
            let values = other
                .values
                .iter()
                .map(|(name, value)| Ok((name.clone(), f(value)?)))
                .collect::<Result<BTreeMap<_, _>, VaultError>>()?;
            Credentials::Other(OtherCredentials { values })
        }
    })
}
