use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use super::backends::{Backend, BackendDirectory};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backends: BackendDirectory,
    pub default_model: String,
    /// `None` means requests wait until the backend answers
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load and validate the config from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reading values through `lookup` so the
    /// config can be built without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backends = match lookup("CHATBOT_BACKENDS") {
            Some(spec) => BackendDirectory::parse(&spec).context("Invalid CHATBOT_BACKENDS")?,
            None => BackendDirectory::default(),
        };

        let default_model = match lookup("CHATBOT_DEFAULT_MODEL") {
            Some(name) => backends
                .get(name.trim())
                .ok_or(anyhow!(
                    "CHATBOT_DEFAULT_MODEL '{}' is not a configured backend",
                    name
                ))?
                .name
                .clone(),
            None => backends.first().name.clone(),
        };

        let timeout_secs = match lookup("CHATBOT_REQUEST_TIMEOUT_SECS") {
            Some(secs) => secs.trim().parse::<u64>().with_context(|| {
                format!("Invalid CHATBOT_REQUEST_TIMEOUT_SECS '{}'", secs)
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        let request_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self {
            backends,
            default_model,
            request_timeout,
        })
    }

    pub fn default_backend(&self) -> &Backend {
        self.backends
            .get(&self.default_model)
            .unwrap_or_else(|| self.backends.first())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let backends = BackendDirectory::default();
        let default_model = backends.first().name.clone();
        Self {
            backends,
            default_model,
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        }
    }
}
