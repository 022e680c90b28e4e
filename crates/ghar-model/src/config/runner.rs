use serde::{Deserialize, Serialize};

use crate::Labels;

/// `runner` section: what to clone and how to name and label the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Base name; the instance is named `<name>-<index>`.
    #[serde(alias = "Name")]
    pub name: String,
    /// Base instance the runner is cloned from.
    #[serde(alias = "Image")]
    pub image: String,
    #[serde(default, alias = "Labels")]
    pub labels: Labels,
}

impl RunnerConfig {
    /// Instance name for the runner with the given sequence index.
    pub fn instance_name(&self, index: u32) -> String {
        format!("{}-{}", self.name, index)
    }
}
