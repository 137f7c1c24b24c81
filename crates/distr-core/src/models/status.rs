//! Health and usage reporting types.

use serde::{Deserialize, Serialize};

/// Health of a single resource as reported by its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Healthy vs. unhealthy resource counts for a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOverview {
    pub healthy: u32,
    pub unhealthy: u32,
}

impl StatusOverview {
    pub fn record(&mut self, status: HealthStatus) {
        if status.is_healthy() {
            self.healthy += 1;
        } else {
            self.unhealthy += 1;
        }
    }

    pub fn total(&self) -> u32 {
        self.healthy + self.unhealthy
    }
}

impl FromIterator<HealthStatus> for StatusOverview {
    fn from_iter<I: IntoIterator<Item = HealthStatus>>(iter: I) -> Self {
        let mut overview = StatusOverview::default();
        for status in iter {
            overview.record(status);
        }
        overview
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Limit {
    #[default]
    Limited,
    Unlimited,
}

/// Consumption of a resource against its quota.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(rename = "type", default)]
    pub kind: Limit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
}
