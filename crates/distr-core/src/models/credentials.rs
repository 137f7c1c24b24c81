//! Cloud credential variants attached to a deployment.
//!
//! [`Credentials`] is the plaintext form handed to backend services.
//! [`SealedCredentials`] wraps the same shape with every secret field
//! replaced by vault ciphertext; it is the only form that is persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    pub id: String,
    pub secret: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub secret: String,
}

/// Arbitrary key-value credentials; every value is treated as secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherCredentials {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Exactly one credential variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Credentials {
    Aws(AwsCredentials),
    Azure(AzureCredentials),
    Other(OtherCredentials),
}

impl Credentials {
    pub fn aws(&self) -> Option<&AwsCredentials> {
        match self {
            Credentials::Aws(c) => Some(c),
            _ => None,
        }
    }

    pub fn azure(&self) -> Option<&AzureCredentials> {
        match self {
            Credentials::Azure(c) => Some(c),
            _ => None,
        }
    }

    pub fn other(&self) -> Option<&OtherCredentials> {
        match self {
            Credentials::Other(c) => Some(c),
            _ => None,
        }
    }

    /// Short label for logging; never includes secret material.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Credentials::Aws(_) => "aws",
            Credentials::Azure(_) => "azure",
            Credentials::Other(_) => "other",
        }
    }
}

/// Credentials whose secret fields hold vault ciphertext.
///
/// Only the vault can turn this back into [`Credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedCredentials(Credentials);

impl SealedCredentials {
    /// Wrap credentials whose secret fields are already encrypted.
    pub fn from_ciphertext(inner: Credentials) -> Self {
        Self(inner)
    }

    pub fn as_ciphertext(&self) -> &Credentials {
        &self.0
    }

    pub fn variant_name(&self) -> &'static str {
        self.0.variant_name()
    }
}
