//! Orchestration configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Period of the background revalidation sweep (default: 3600 = 1 hour).
    pub revalidation_interval_secs: u64,
}

impl RegistryConfig {
    pub fn revalidation_interval(&self) -> Duration {
        Duration::from_secs(self.revalidation_interval_secs.max(1))
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            revalidation_interval_secs: 3600,
        }
    }
}
