//! Service domain model.
//!
//! A service is a registered third-party integration implementing the
//! `co.mechen.distr.common.v1` contract. Services are shared: many
//! resources across many deployments reference the same service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform a service provisions resources on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "AWS")]
    Aws,
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
    #[default]
    Other,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Aws => "AWS",
            Platform::Azure => "Azure",
            Platform::Gcp => "GCP",
            Platform::Other => "Other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWS" => Ok(Platform::Aws),
            "Azure" => Ok(Platform::Azure),
            "GCP" => Ok(Platform::Gcp),
            "Other" => Ok(Platform::Other),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    /// Brief one-line summary.
    pub summary: String,
    pub description: String,
    pub platform: Platform,
    /// Organisation that published the service, if any.
    pub author_id: Option<Uuid>,
    /// Schema namespace that contains `MainService`.
    pub namespace: String,
    /// Address the RPC client connects to.
    pub service_url: String,
    /// Address the schema is fetched from.
    pub introspection_url: String,
    pub documentation_url: String,
    pub source_code_url: String,
    /// Curated trust flag, only set by an operator.
    pub verified: bool,
    /// Set when periodic validation fails; blocked services accept no new
    /// resources.
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller input for registering a service. The namespace is not supplied;
/// it is extracted from the fetched schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceInput {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub platform: Platform,
    pub author_id: Option<Uuid>,
    pub service_url: String,
    pub introspection_url: String,
    pub documentation_url: String,
    pub source_code_url: String,
}

/// Repository input, produced after validation succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub platform: Platform,
    pub author_id: Option<Uuid>,
    pub namespace: String,
    pub service_url: String,
    pub introspection_url: String,
    pub documentation_url: String,
    pub source_code_url: String,
}

impl CreateService {
    pub fn from_input(input: CreateServiceInput, namespace: String) -> Self {
        Self {
            name: input.name,
            summary: input.summary,
            description: input.description,
            platform: input.platform,
            author_id: input.author_id,
            namespace,
            service_url: input.service_url,
            introspection_url: input.introspection_url,
            documentation_url: input.documentation_url,
            source_code_url: input.source_code_url,
        }
    }
}

/// Caller input for an explicit service update.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateServiceInput {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub platform: Option<Platform>,
    pub service_url: Option<String>,
    pub introspection_url: Option<String>,
    pub documentation_url: Option<String>,
    pub source_code_url: Option<String>,
    pub verified: Option<bool>,
}

/// Repository input for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateService {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub platform: Option<Platform>,
    pub namespace: Option<String>,
    pub service_url: Option<String>,
    pub introspection_url: Option<String>,
    pub documentation_url: Option<String>,
    pub source_code_url: Option<String>,
    pub verified: Option<bool>,
    pub blocked: Option<bool>,
}

impl UpdateService {
    pub fn blocked(blocked: bool) -> Self {
        Self {
            blocked: Some(blocked),
            ..Default::default()
        }
    }

    pub fn from_input(input: UpdateServiceInput, namespace: Option<String>) -> Self {
        Self {
            name: input.name,
            summary: input.summary,
            description: input.description,
            platform: input.platform,
            namespace,
            service_url: input.service_url,
            introspection_url: input.introspection_url,
            documentation_url: input.documentation_url,
            source_code_url: input.source_code_url,
            verified: input.verified,
            blocked: None,
        }
    }
}
