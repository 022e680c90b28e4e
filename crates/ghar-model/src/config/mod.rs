//! The `lxd-ghar` configuration document.
//!
//! ```yaml
//! repository: https://github.com/rgl/lxd-ghar
//! runner:
//!   name: ci
//!   image: base
//!   labels: [self-hosted, lxd]
//! ```
//!
//! Optional sections: `agent`, `readiness`, `backend` and `logger`.
//! Keys may also be written capitalized (`Repository`, `Runner`, `Name`, ...).
mod agent;
mod backend;
mod readiness;
mod runner;

pub use agent::AgentConfig;
pub use backend::{BackendConfig, BackendKind};
pub use readiness::ReadinessConfig;
pub use runner::RunnerConfig;

use std::path::Path;

use ghar_observe::LoggerConfig;
use serde::{Deserialize, Serialize};

use crate::{
    RepositoryUrl,
    error::{ModelError, ModelResult},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Raw repository URL; see [`Config::repository_url`].
    #[serde(alias = "Repository")]
    pub repository: String,
    #[serde(alias = "Runner")]
    pub runner: RunnerConfig,
    #[serde(default, alias = "Agent")]
    pub agent: AgentConfig,
    #[serde(default, alias = "Readiness")]
    pub readiness: ReadinessConfig,
    #[serde(default, alias = "Backend")]
    pub backend: BackendConfig,
    #[serde(default, alias = "Logger")]
    pub logger: LoggerConfig,
}

impl Config {
    /// Reads, parses and validates the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> ModelResult<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the fields that serde cannot.
    pub fn validate(&self) -> ModelResult<()> {
        if self.runner.name.trim().is_empty() {
            return Err(ModelError::Invalid("runner.name cannot be empty".into()));
        }
        if self.runner.image.trim().is_empty() {
            return Err(ModelError::Invalid("runner.image cannot be empty".into()));
        }
        if self.agent.user.trim().is_empty() {
            return Err(ModelError::Invalid("agent.user cannot be empty".into()));
        }
        if self.readiness.command.is_empty() {
            return Err(ModelError::Invalid("readiness.command cannot be empty".into()));
        }
        if self.readiness.sentinel.trim().is_empty() {
            return Err(ModelError::Invalid("readiness.sentinel cannot be empty".into()));
        }
        if self.readiness.timeout_ms == Some(0) {
            return Err(ModelError::Invalid("readiness.timeout_ms cannot be zero".into()));
        }
        Ok(())
    }

    /// Parses [`Config::repository`].
    pub fn repository_url(&self) -> ModelResult<RepositoryUrl> {
        RepositoryUrl::parse(&self.repository)
    }
}
