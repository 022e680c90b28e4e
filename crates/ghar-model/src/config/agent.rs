use serde::{Deserialize, Serialize};

/// `agent` section: the guest-side contract of the base image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Service account the agent runs as.
    pub user: String,
    /// Login shell used for that account.
    pub shell: String,
    /// Unattended configuration entry point.
    pub config_script: String,
    /// Entry point that starts the job-processing loop.
    pub run_script: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            user: "ghar".to_string(),
            shell: "/bin/bash".to_string(),
            config_script: "/home/ghar/runner/config.sh".to_string(),
            run_script: "/home/ghar/runner/run.sh".to_string(),
        }
    }
}
