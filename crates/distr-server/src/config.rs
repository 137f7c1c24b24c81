//! Server configuration.
//!
//! Loaded from an optional `distr.toml` in the working directory, then
//! `DISTR__<SECTION>__<KEY>` environment variables, over the defaults
//! below.

use distr_db::DbConfig;
use distr_orchestrator::RegistryConfig;
use distr_vault::VaultConfig;
use serde::Deserialize;

const ENV_PREFIX: &str = "DISTR";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub database: DatabaseSection,
    pub vault: VaultSection,
    pub registry: RegistrySection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Deserialize)]
pub struct VaultSection {
    pub passphrase: String,
    pub salt: String,
}

impl std::fmt::Debug for VaultSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSection")
            .field("passphrase", &"<redacted>")
            .field("salt", &self.salt)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySection {
    pub revalidation_interval_secs: u64,
}

impl ServerConfig {
    pub fn db(&self) -> DbConfig {
        DbConfig {
            url: self.database.url.clone(),
            namespace: self.database.namespace.clone(),
            database: self.database.database.clone(),
            username: self.database.username.clone(),
            password: self.database.password.clone(),
        }
    }

    pub fn vault(&self) -> VaultConfig {
        VaultConfig {
            passphrase: self.vault.passphrase.clone(),
            salt: self.vault.salt.clone(),
        }
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            revalidation_interval_secs: self.registry.revalidation_interval_secs,
        }
    }
}

pub fn load() -> anyhow::Result<ServerConfig> {
    let env = config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true);

    let builder = config::Config::builder()
        .add_source(config::File::with_name("distr").required(false))
        .add_source(env);

    finish(builder)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<ServerConfig> {
    let db = DbConfig::default();
    let vault = VaultConfig::default();
    let registry = RegistryConfig::default();

    let cfg = builder
        .set_default("database.url", db.url)?
        .set_default("database.namespace", db.namespace)?
        .set_default("database.database", db.database)?
        .set_default("database.username", db.username)?
        .set_default("database.password", db.password)?
        .set_default("vault.passphrase", vault.passphrase)?
        .set_default("vault.salt", vault.salt)?
        .set_default(
            "registry.revalidation_interval_secs",
            registry.revalidation_interval_secs,
        )?
        .build()?;

    let app: ServerConfig = cfg.try_deserialize()?;
    if app.vault.passphrase.trim().is_empty() {
        anyhow::bail!("vault.passphrase must be set (DISTR__VAULT__PASSPHRASE)");
    }
    if app.vault.salt.len() < 8 {
        anyhow::bail!("vault.salt must be at least 8 bytes");
    }
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> anyhow::Result<ServerConfig> {
        finish(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = from_toml("[vault]\npassphrase = \"correct horse\"\n").unwrap();

        assert_eq!(cfg.database.url, "ws://127.0.0.1:8000");
        assert_eq!(cfg.database.namespace, "distr");
        assert_eq!(cfg.vault.salt, "distr-credential-vault");
        assert_eq!(cfg.registry.revalidation_interval_secs, 3600);
        assert_eq!(cfg.registry().revalidation_interval().as_secs(), 3600);
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg = from_toml(
            r#"
            [database]
            url = "wss://db.internal:8000"
            database = "staging"

            [vault]
            passphrase = "correct horse"

            [registry]
            revalidation_interval_secs = 60
            "#,
        )
        .unwrap();

        let db = cfg.db();
        assert_eq!(db.url, "wss://db.internal:8000");
        assert_eq!(db.database, "staging");
        assert_eq!(db.username, "root");
        assert_eq!(cfg.registry().revalidation_interval_secs, 60);
    }

    #[test]
    fn missing_passphrase_is_rejected() {
        let err = from_toml("").unwrap_err();
        assert!(err.to_string().contains("vault.passphrase"));
    }

    #[test]
    fn short_salt_is_rejected() {
        let err = from_toml("[vault]\npassphrase = \"x\"\nsalt = \"short\"\n").unwrap_err();
        assert!(err.to_string().contains("vault.salt"));
    }

    #[test]
    fn debug_redacts_passphrase() {
        let cfg = from_toml("[vault]\npassphrase = \"correct horse\"\n").unwrap();
        let rendered = format!("{:?}", cfg.vault);
        assert!(!rendered.contains("correct horse"));
    }
}
