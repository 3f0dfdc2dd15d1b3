use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AssessError, Result};
use crate::rules::policy::Policy;

/// Top-level configuration from `.sqlassess.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Evaluation worker threads; 0 means one per core.
    #[serde(default)]
    pub concurrency: usize,
    /// Seconds to wait for target metadata.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Rule files or directories, loaded in order. Relative paths resolve
    /// against the config file's directory.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.engine.timeout_secs == 0 {
            return Err(AssessError::Config("engine.timeout_secs must be at least 1".into()));
        }

        if let Some(base) = path.parent() {
            for catalog_path in &mut config.catalog.paths {
                if catalog_path.is_relative() {
                    *catalog_path = base.join(&*catalog_path);
                }
            }
        }
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# sqlassess configuration

[engine]
# Evaluation worker threads (0 = one per CPU core).
concurrency = 0
# Seconds to wait for target metadata before giving up.
timeout_secs = 30

[catalog]
# Rule files or directories of *.toml rule files, loaded in order.
# Later definitions of the same check ID replace earlier ones.
paths = ["rules"]

[policy]
# Check IDs that never run.
# disabled_checks = ["TraceFlag1118"]

# Per-check level overrides (information, warning, error).
# [policy.overrides]
# "AutoShrink" = "information"
"#
    }
}
