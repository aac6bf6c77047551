//! Engine configuration

use crate::error::ConfigError;
use redline_model::Role;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
///
/// Every field has a default, so a partial TOML document is enough:
///
/// ```toml
/// rewrite_timeout_ms = 10000
/// min_review_role = "super-admin"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound on one rewrite-service call
    pub rewrite_timeout_ms: u64,
    /// Lowest role allowed to accept or reject
    pub min_review_role: Role,
    /// Largest accepted before/after snapshot, in bytes
    pub max_snapshot_len: usize,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML and validate
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or a value is out of range
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// With rewrite timeout
    #[inline]
    #[must_use]
    pub fn with_rewrite_timeout(mut self, timeout: Duration) -> Self {
        self.rewrite_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With minimum review role
    #[inline]
    #[must_use]
    pub fn with_min_review_role(mut self, role: Role) -> Self {
        self.min_review_role = role;
        self
    }

    /// With snapshot size limit
    #[inline]
    #[must_use]
    pub fn with_max_snapshot_len(mut self, len: usize) -> Self {
        self.max_snapshot_len = len;
        self
    }

    /// Rewrite timeout as a duration
    #[inline]
    #[must_use]
    pub fn rewrite_timeout(&self) -> Duration {
        Duration::from_millis(self.rewrite_timeout_ms)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `ConfigError::ReviewRoleTooLow` if `min_review_role` is below `publish`
    /// - `ConfigError::Zero` for a zero timeout or size limit
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_review_role.can_review() {
            return Err(ConfigError::ReviewRoleTooLow(self.min_review_role));
        }
        if self.rewrite_timeout_ms == 0 {
            return Err(ConfigError::Zero("rewrite_timeout_ms"));
        }
        if self.max_snapshot_len == 0 {
            return Err(ConfigError::Zero("max_snapshot_len"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rewrite_timeout_ms: 30_000,
            min_review_role: Role::MIN_REVIEW,
            max_snapshot_len: 1024 * 1024, // 1MB
        }
    }
}
