use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend has no instance with this name.
    ///
    /// Surfaces only from raw capability calls;
    /// [`ContainerClient::exists`](super::ContainerClient::exists) turns it into `false`.
    #[error("instance {0} not found")]
    NotFound(String),

    #[error("container backend unavailable: {0}")]
    Unavailable(String),

    #[error("{op} {target} failed: {message}")]
    Request {
        op: &'static str,
        target: String,
        message: String,
    },

    #[error("unexpected backend response: {0}")]
    Protocol(String),

    #[error("command exited with code {exit_code}: stdout={stdout} stderr={stderr}")]
    NonZeroExit {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("instance {name} not ready after {waited:?}")]
    ReadinessTimeout { name: String, waited: Duration },

    #[error("canceled")]
    Canceled,

    #[error("failed to exec {program}: {message}")]
    Handoff { program: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Adds the failing sub-step and resource to an error.
    #[error("failed to {step} {target}: {source}")]
    Step {
        step: &'static str,
        target: String,
        #[source]
        source: Box<BackendError>,
    },
}

impl BackendError {
    /// Wraps `self` with the sub-step (`"stop"`, `"delete"`, ...) and resource it failed on.
    pub fn in_step(self, step: &'static str, target: &str) -> Self {
        BackendError::Step {
            step,
            target: target.to_string(),
            source: Box::new(self),
        }
    }

    /// `true` for [`BackendError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }

    /// The innermost error, skipping [`BackendError::Step`] wrappers.
    pub fn root(&self) -> &BackendError {
        match self {
            BackendError::Step { source, .. } => source.root(),
            other => other,
        }
    }
}
