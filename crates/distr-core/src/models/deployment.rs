//! Deployment domain model.
//!
//! A deployment is the tenant-scoped unit that carries cloud credentials.
//! Every resource lives in exactly one deployment and is provisioned with
//! that deployment's credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credentials::{Credentials, SealedCredentials};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Uuid,
    /// The system this deployment belongs to.
    pub system_id: Uuid,
    pub name: String,
    /// Credential variant with every secret field encrypted.
    pub credentials: SealedCredentials,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository input: credentials must already be sealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeployment {
    pub system_id: Uuid,
    pub name: String,
    pub credentials: SealedCredentials,
}

/// Repository input for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateDeployment {
    pub name: Option<String>,
    /// Replaces the stored variant entirely.
    pub credentials: Option<SealedCredentials>,
}

/// Caller input carrying plaintext credentials; sealed before storage.
#[derive(Debug, Clone)]
pub struct CreateDeploymentInput {
    pub system_id: Uuid,
    pub name: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDeploymentInput {
    pub name: Option<String>,
    pub credentials: Option<Credentials>,
}
