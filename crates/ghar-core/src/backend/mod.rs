//! Container backend capability and the client built on top of it.
//!
//! [`InstanceBackend`] is the narrow contract a binding has to fulfil (one
//! call per backend operation, operations awaited to completion).
//! [`ContainerClient`] adds the semantics the lifecycle relies on: reclaim
//! before clone, readiness wait after start, structured exec failures and the
//! terminal process handoff.
mod error;
pub use error::BackendError;

mod instance;
pub use instance::{
    ExecOutput, ExecRequest, HandoffTarget, InstanceStatus, InstanceView, LoginUser, StateAction,
    StateChange,
};

mod client;
pub use client::{ContainerClient, ReadinessProbe};

#[cfg(test)]
pub(crate) mod fake;

use std::convert::Infallible;

use async_trait::async_trait;

/// Operations a container backend binding provides.
///
/// Every async method returns only after the backend reports the operation
/// as complete (or failed).
#[async_trait]
pub trait InstanceBackend: Send + Sync {
    /// Binding name used in logs.
    fn name(&self) -> &'static str;

    /// Looks up an instance. Absence is reported as [`BackendError::NotFound`].
    async fn get_instance(&self, name: &str) -> Result<InstanceView, BackendError>;

    /// `true` if an instance named `name` exists. Any failure other than
    /// not-found is propagated.
    async fn exists(&self, name: &str) -> Result<bool, BackendError> {
        match self.get_instance(name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn update_state(&self, name: &str, change: &StateChange) -> Result<(), BackendError>;

    /// Copies instance `source` to a new instance `dest`.
    async fn copy_instance(&self, source: &str, dest: &str) -> Result<(), BackendError>;

    async fn delete_instance(&self, name: &str) -> Result<(), BackendError>;

    /// Runs a command to completion, capturing both output streams.
    async fn exec(&self, name: &str, request: &ExecRequest) -> Result<ExecOutput, BackendError>;

    /// Program the calling process becomes to run `command` as `user` inside `name`.
    fn handoff_target(&self, name: &str, user: &str, command: &str) -> HandoffTarget;
}

/// Replaces the calling process image.
///
/// On success `replace` never returns, which is why its success type is
/// uninhabited.
pub trait ProcessReplacer: Send + Sync {
    fn replace(&self, target: &HandoffTarget) -> Result<Infallible, BackendError>;
}
