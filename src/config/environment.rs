//! Environment variable integration for authtunnel configuration
//!
//! Environment values always win over file values. Secrets are the only
//! settings that can be overridden this way, so they can be injected at
//! deploy time without touching the config file.

use crate::config::Config;
use std::env;
use tracing::debug;

/// Environment variable names used by authtunnel
pub struct EnvVars;

impl EnvVars {
    /// Overrides `server.state_secret`
    pub const STATE_SECRET: &'static str = "AUTHTUNNEL_STATE_SECRET";

    /// Name of the per-downstream client secret override:
    /// `AUTHTUNNEL_<NAME>_CLIENT_SECRET` with the downstream name uppercased
    /// and `-` replaced by `_`.
    pub fn client_secret_var(downstream_name: &str) -> String {
        format!(
            "AUTHTUNNEL_{}_CLIENT_SECRET",
            downstream_name.to_uppercase().replace('-', "_")
        )
    }
}

/// Environment configuration overrides
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOverrides {
    /// State secret override
    pub state_secret: Option<String>,
}

impl EnvironmentOverrides {
    /// Load environment variable overrides
    pub fn load() -> Self {
        let mut overrides = EnvironmentOverrides::default();

        if let Ok(val) = env::var(EnvVars::STATE_SECRET) {
            // The value is a secret; log only the variable name.
            debug!("Environment override: {} is set", EnvVars::STATE_SECRET);
            overrides.state_secret = Some(val);
        }

        overrides
    }

    /// Apply environment overrides to a config. Per-downstream client secret
    /// overrides are resolved here because they depend on the configured names.
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(ref secret) = self.state_secret {
            config.server.state_secret = secret.clone();
        }

        for ds in &mut config.downstreams {
            let var = EnvVars::client_secret_var(&ds.name);
            if let Ok(val) = env::var(&var) {
                debug!("Environment override: {} is set", var);
                ds.oauth_client_secret = val;
            }
        }
    }
}
