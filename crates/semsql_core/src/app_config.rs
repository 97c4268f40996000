use crate::DbError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide configuration for the pool, session manager, ontology
/// builder, prompt composer and SQL agent. Loaded once at startup and held
/// inside `CoreContext`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub pool_min: u32,
    pub pool_max: u32,
    pub pool_idle_timeout_secs: u64,
    /// How long an `acquire()` call blocks on a saturated pool before
    /// failing with `PoolExhausted`.
    pub pool_acquire_wait_ms: u64,
    pub session_idle_timeout_secs: u64,
    pub snapshot_ttl_secs: u64,
    /// Batch size `B` the Ontology Builder partitions tables into.
    pub ontology_batch_size: usize,
    /// Approximate token budget for the initial (non-retry) prompt.
    pub prompt_token_budget: usize,
    pub default_max_retries: u32,
    /// Whether C10's VALIDATE step rejects identifiers absent from the
    /// active snapshot on the very first attempt. `spec.md` §9 leaves this
    /// an open question; this core resolves it as `false` (see DESIGN.md) —
    /// retries always enforce containment regardless of this flag.
    pub strict_containment_on_first_attempt: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pool_min: 0,
            pool_max: 10,
            pool_idle_timeout_secs: 300,
            pool_acquire_wait_ms: 5000,
            session_idle_timeout_secs: 1800,
            snapshot_ttl_secs: 3600,
            ontology_batch_size: 10,
            prompt_token_budget: 4000,
            default_max_retries: 3,
            strict_containment_on_first_attempt: false,
        }
    }
}

impl CoreConfig {
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }

    pub fn pool_acquire_wait(&self) -> Duration {
        Duration::from_millis(self.pool_acquire_wait_ms)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }
}

pub struct CoreConfigStore {
    path: PathBuf,
}

impl CoreConfigStore {
    pub fn new() -> Result<Self, DbError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DbError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        let app_dir = config_dir.join("semsql");
        fs::create_dir_all(&app_dir).map_err(DbError::IoError)?;

        Ok(Self {
            path: app_dir.join("config.json"),
        })
    }

    pub fn load(&self) -> Result<CoreConfig, DbError> {
        if !self.path.exists() {
            return Ok(CoreConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(DbError::IoError)?;
        serde_json::from_str(&content).map_err(|e| DbError::InvalidProfile(e.to_string()))
    }

    pub fn save(&self, config: &CoreConfig) -> Result<(), DbError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| DbError::InvalidProfile(e.to_string()))?;
        fs::write(&self.path, content).map_err(DbError::IoError)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.default_max_retries, 3);
        assert_eq!(cfg.ontology_batch_size, 10);
        assert_eq!(cfg.snapshot_ttl(), Duration::from_secs(3600));
    }
}
