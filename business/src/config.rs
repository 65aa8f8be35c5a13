use std::env::vars;
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::{Error, Latency, Result};

const ENV_PREFIX: &str = "ROSTER_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    /// Simulated latency of every user store call.
    pub user_latency_ms: u64,
    /// Simulated latency of every asset store call.
    pub asset_latency_ms: u64,
    /// Start with the three demo users.
    pub seed_demo_users: bool,
    /// Reject malformed fields in the update use-case, not only in the form.
    pub strict_validation: bool,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            user_latency_ms: 300,
            asset_latency_ms: 1,
            seed_demo_users: true,
            strict_validation: false,
        }
    }
}

impl BusinessConfig {
    /// Reads `ROSTER_*` variables, falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        info!("Loading business configuration from environment variables");
        Self::from_vars(vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let scoped: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.as_ref()
                    .strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_owned(), value.as_ref().to_owned()))
            })
            .collect();

        serde_env::from_iter(scoped)
            .map_err(|e| Error::invalid_argument(format!("Invalid configuration: {e}")))
    }

    /// No latency and no demo data.
    pub fn for_test() -> Self {
        Self {
            user_latency_ms: 0,
            asset_latency_ms: 0,
            seed_demo_users: false,
            strict_validation: false,
        }
    }

    pub fn user_latency(&self) -> Latency {
        Latency::new(Duration::from_millis(self.user_latency_ms))
    }

    pub fn asset_latency(&self) -> Latency {
        Latency::new(Duration::from_millis(self.asset_latency_ms))
    }
}
