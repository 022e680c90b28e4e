use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Snap installs first, then the classic package location.
const SOCKET_CANDIDATES: &[&str] = &[
    "/var/snap/lxd/common/lxd/unix.socket",
    "/var/lib/lxd/unix.socket",
];

/// Which binding talks to the container backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Invoke the `lxc` command-line tool as a subprocess.
    #[default]
    Cli,
    /// Call the LXD REST API over its local unix socket.
    Socket,
}

impl std::str::FromStr for BackendKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" | "lxc" => Ok(Self::Cli),
            "socket" | "api" => Ok(Self::Socket),
            other => Err(format!("unknown backend {other} (expected: cli|socket)")),
        }
    }
}

/// `backend` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// `lxc` program name or path. Also used for the final handoff with either binding.
    pub lxc: String,
    /// LXD unix socket; autodetected when absent.
    pub socket: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Cli,
            lxc: "lxc".to_string(),
            socket: None,
        }
    }
}

impl BackendConfig {
    /// Configured socket, or the first well-known location that exists.
    pub fn socket_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.socket {
            return Some(path.clone());
        }
        SOCKET_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }
}
