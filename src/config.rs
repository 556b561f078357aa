//! Layered configuration.
//!
//! Built-in defaults, then `sequester.toml` in the project root (or the file
//! given with `--config`), then `SEQUESTER__`-prefixed environment variables
//! with `__` as the nesting separator:
//!
//! ```bash
//! SEQUESTER__LOCK__STALE_AFTER_SECS=600
//! SEQUESTER__POLICY__DETECTOR__SAFE_THRESHOLD=60
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{QuarantineError, Result};
use crate::policy::Policy;

pub const CONFIG_FILE_NAME: &str = "sequester.toml";
pub const ENV_PREFIX: &str = "SEQUESTER__";
pub const DEFAULT_QUARANTINE_DIR: &str = ".shared_quarantine";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarantineConfig {
    /// Quarantine root; relative paths are resolved against the project root
    pub dir: PathBuf,
    /// Only files matching one of these globs are considered (empty = all)
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_QUARANTINE_DIR),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub stale_after_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 60 * 60,
        }
    }
}

impl LockConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database probed read-only; unset means no verification target
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Directories scanned for this agent, relative to the project root
    pub scope: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub quarantine: QuarantineConfig,
    pub lock: LockConfig,
    pub database: DatabaseConfig,
    pub policy: Policy,
    pub logging: LoggingConfig,
    pub agents: BTreeMap<String, AgentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quarantine: QuarantineConfig::default(),
            lock: LockConfig::default(),
            database: DatabaseConfig::default(),
            policy: Policy::default(),
            logging: LoggingConfig::default(),
            agents: default_agents(),
        }
    }
}

fn preset(dirs: &[&str]) -> AgentConfig {
    AgentConfig {
        scope: dirs.iter().map(PathBuf::from).collect(),
    }
}

/// Built-in `backend`, `frontend` and `shared` scopes.
fn default_agents() -> BTreeMap<String, AgentConfig> {
    let mut agents = BTreeMap::new();
    agents.insert(
        "backend".to_string(),
        preset(&[
            "src/app/api",
            "src/lib",
            "src/middleware",
            "src/types",
            "src/utils",
            "src/config",
            "src/constants",
            "supabase",
            "migrations",
        ]),
    );
    agents.insert(
        "frontend".to_string(),
        preset(&[
            "src/app",
            "src/components",
            "src/hooks",
            "src/contexts",
            "src/providers",
            "src/styles",
        ]),
    );
    agents.insert(
        "shared".to_string(),
        preset(&["src/lib", "src/utils", "src/types", "src/constants", "src/shared"]),
    );
    agents
}

impl Config {
    /// Load for `project_root`. An explicit `config_path` must exist; the
    /// implicit `sequester.toml` is optional.
    pub fn load(project_root: &Path, config_path: Option<&Path>) -> Result<Self> {
        Self::figment(project_root, config_path)?
            .extract()
            .map_err(|e| QuarantineError::Config(e.to_string()))
    }

    pub fn figment(project_root: &Path, config_path: Option<&Path>) -> Result<Figment> {
        let file = match config_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(QuarantineError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => project_root.join(CONFIG_FILE_NAME),
        };

        Ok(Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Quarantine root resolved against the project root.
    pub fn quarantine_root(&self, project_root: &Path) -> PathBuf {
        if self.quarantine.dir.is_absolute() {
            self.quarantine.dir.clone()
        } else {
            project_root.join(&self.quarantine.dir)
        }
    }

    /// Configured database path resolved against the project root.
    pub fn database_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.database.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                project_root.join(p)
            }
        })
    }

    /// Scope for `agent`; `NoScope` when neither configured nor preset.
    pub fn agent_scope(&self, agent: &str) -> Result<Vec<PathBuf>> {
        match self.agents.get(agent) {
            Some(cfg) if !cfg.scope.is_empty() => Ok(cfg.scope.clone()),
            _ => Err(QuarantineError::NoScope(agent.to_string())),
        }
    }
}
