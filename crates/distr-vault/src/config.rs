//! Vault configuration.

/// Key material inputs. The derived key is never persisted; the same
/// passphrase and salt must be supplied on every start to read existing
/// ciphertext.
#[derive(Clone)]
pub struct VaultConfig {
    pub passphrase: String,
    /// At least 8 bytes.
    pub salt: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            salt: "distr-credential-vault".into(),
        }
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("passphrase", &"<redacted>")
            .field("salt", &self.salt)
            .finish()
    }
}
