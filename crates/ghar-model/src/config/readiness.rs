use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `readiness` section: how to tell that the guest finished booting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Probe argv executed inside the guest.
    ///
    /// The default swallows the non-zero exit of `systemctl is-system-running`
    /// while the system is still `starting`, so only transport failures abort.
    pub command: Vec<String>,
    /// Trimmed probe stdout that marks the guest as ready.
    pub sentinel: String,
    /// Pause between probes.
    pub interval_ms: u64,
    /// Upper bound of the whole wait; `None` waits forever.
    pub timeout_ms: Option<u64>,
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "systemctl is-system-running || true".to_string(),
            ],
            sentinel: "running".to_string(),
            interval_ms: 1_000,
            timeout_ms: None,
        }
    }
}
