//! The fixed set of chat completion backends a session can talk to.
use std::collections::HashSet;
use std::fmt;

use anyhow::{Result, anyhow, bail};
use reqwest::Url;

/// Built in backends used when no override is configured.
pub const DEFAULT_BACKENDS: &[(&str, &str)] = &[
    (
        "meta/llama-2-7b-chat",
        "http://0.0.0.0:8000/v1/chat/completions",
    ),
    (
        "nv-mistralai/mistral-nemo-minitron-8b-8k-instruct",
        "http://0.0.0.0:8080/v1/chat/completions",
    ),
];

#[derive(Clone, Debug, PartialEq)]
pub struct Backend {
    /// Model identifier sent as `model` in the request payload
    pub name: String,
    pub endpoint: Url,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.endpoint)
    }
}

/// Read-only mapping of model name to endpoint. Order is preserved so
/// the selection list is stable and entries can be picked by index.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendDirectory(Vec<Backend>);

impl BackendDirectory {
    /// Builds a directory from `(name, url)` pairs, rejecting empty
    /// lists, blank or duplicate names, and endpoints that aren't
    /// absolute http(s) URLs.
    pub fn from_pairs<N, U>(pairs: &[(N, U)]) -> Result<Self>
    where
        N: AsRef<str>,
        U: AsRef<str>,
    {
        if pairs.is_empty() {
            bail!("Backend directory is empty");
        }

        let mut seen = HashSet::new();
        let mut backends = Vec::with_capacity(pairs.len());
        for (name, url) in pairs {
            let name = name.as_ref().trim();
            let url = url.as_ref().trim();
            if name.is_empty() {
                bail!("Backend with endpoint '{}' is missing a name", url);
            }
            if !seen.insert(name.to_string()) {
                bail!("Duplicate backend name '{}'", name);
            }
            let endpoint = Url::parse(url)
                .map_err(|e| anyhow!("Invalid endpoint for backend '{}': {} ({})", name, url, e))?;
            if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
                bail!(
                    "Endpoint for backend '{}' must be an http(s) URL: {}",
                    name,
                    url
                );
            }
            backends.push(Backend {
                name: name.to_string(),
                endpoint,
            });
        }

        Ok(Self(backends))
    }

    /// Parses the `name=url,name=url` form used by `CHATBOT_BACKENDS`.
    pub fn parse(spec: &str) -> Result<Self> {
        let pairs = spec
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .split_once('=')
                    .ok_or(anyhow!("Expected name=url, got '{}'", entry))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_pairs(&pairs)
    }

    pub fn get(&self, name: &str) -> Option<&Backend> {
        self.0.iter().find(|b| b.name == name)
    }

    /// Looks a backend up by name, falling back to a 1-based index into
    /// the list.
    pub fn select(&self, key: &str) -> Option<&Backend> {
        let key = key.trim();
        self.get(key).or_else(|| {
            key.parse::<usize>()
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| self.0.get(i))
        })
    }

    /// First entry. A directory is never empty.
    pub fn first(&self) -> &Backend {
        &self.0[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Backend> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for BackendDirectory {
    fn default() -> Self {
        // DEFAULT_BACKENDS is non-empty and every entry passes
        // `from_pairs` (pinned by test_default_matches_validated_pairs),
        // so nothing is filtered out and `first()` always has an entry
        Self(
            DEFAULT_BACKENDS
                .iter()
                .filter_map(|(name, url)| {
                    Url::parse(url).ok().map(|endpoint| Backend {
                        name: name.to_string(),
                        endpoint,
                    })
                })
                .collect(),
        )
    }
}
