//! Event store configuration.

use std::path::PathBuf;

use chronicle_core::error::DomainError;
use chronicle_core::store::ConcurrencyPolicy;
use serde::{Deserialize, Serialize};

/// Environment variable naming the record directory.
pub const STORE_DIR_VAR: &str = "CHRONICLE_STORE_DIR";

/// Environment variable selecting the [`ConcurrencyPolicy`].
pub const CONCURRENCY_POLICY_VAR: &str = "CHRONICLE_CONCURRENCY_POLICY";

/// Settings for a file-backed event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStoreConfig {
    /// Directory holding the record files.
    pub root_dir: PathBuf,
    /// Expected-version rule applied on save.
    #[serde(default)]
    pub concurrency_policy: ConcurrencyPolicy,
}

impl EventStoreConfig {
    /// Configuration for `root_dir` with the default policy.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            concurrency_policy: ConcurrencyPolicy::default(),
        }
    }

    /// Sets the concurrency policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.concurrency_policy = policy;
        self
    }

    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if [`STORE_DIR_VAR`] is unset or
    /// empty, or the policy variable holds an unknown value.
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_dir = lookup(STORE_DIR_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                DomainError::Configuration(format!(
                    "{STORE_DIR_VAR} environment variable must be set"
                ))
            })?;
        let concurrency_policy = match lookup(CONCURRENCY_POLICY_VAR) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => ConcurrencyPolicy::default(),
        };

        Ok(Self {
            root_dir: PathBuf::from(root_dir),
            concurrency_policy,
        })
    }
}
