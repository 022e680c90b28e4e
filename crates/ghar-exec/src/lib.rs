//! Container backend bindings and process replacement for `ghar-core`.
pub mod lxd;

mod replace;
pub use replace::ExecReplacer;

#[cfg(feature = "subprocess")]
pub mod subprocess;

#[cfg(feature = "socket")]
pub mod socket;

use std::sync::Arc;

use ghar_core::backend::{BackendError, InstanceBackend};
use ghar_model::{BackendConfig, BackendKind};
use tracing::info;

/// Builds the binding selected by `cfg`.
///
/// Bindings left out at compile time are reported as unavailable.
pub fn connect(cfg: &BackendConfig) -> Result<Arc<dyn InstanceBackend>, BackendError> {
    match cfg.kind {
        BackendKind::Cli => cli(cfg),
        BackendKind::Socket => unix_socket(cfg),
    }
}

#[cfg(feature = "subprocess")]
fn cli(cfg: &BackendConfig) -> Result<Arc<dyn InstanceBackend>, BackendError> {
    info!(program = %cfg.lxc, "using the lxc command-line backend");
    Ok(Arc::new(subprocess::LxcCli::new(cfg.lxc.clone())))
}

#[cfg(not(feature = "subprocess"))]
fn cli(_cfg: &BackendConfig) -> Result<Arc<dyn InstanceBackend>, BackendError> {
    Err(BackendError::Unavailable(
        "lxc command-line backend not compiled in (feature `subprocess`)".into(),
    ))
}

#[cfg(feature = "socket")]
fn unix_socket(cfg: &BackendConfig) -> Result<Arc<dyn InstanceBackend>, BackendError> {
    let path = cfg.socket_path().ok_or_else(|| {
        BackendError::Unavailable("no LXD unix socket found; set backend.socket".into())
    })?;
    info!(socket = %path.display(), "using the LXD socket backend");
    Ok(Arc::new(socket::LxdSocket::new(path, cfg.lxc.clone())))
}

#[cfg(not(feature = "socket"))]
fn unix_socket(_cfg: &BackendConfig) -> Result<Arc<dyn InstanceBackend>, BackendError> {
    Err(BackendError::Unavailable(
        "LXD socket backend not compiled in (feature `socket`)".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "subprocess")]
    fn cli_is_the_default_binding() {
        let backend = connect(&BackendConfig::default()).unwrap();
        assert_eq!(backend.name(), "lxc");
    }

    #[test]
    #[cfg(feature = "socket")]
    fn socket_binding_uses_configured_path() {
        let cfg = BackendConfig {
            kind: BackendKind::Socket,
            socket: Some("/run/lxd.socket".into()),
            ..BackendConfig::default()
        };
        assert_eq!(connect(&cfg).unwrap().name(), "lxd-socket");
    }
}
