//! Binding that calls the LXD REST API over its local unix socket.
mod stream;
mod transport;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ghar_core::backend::{
    BackendError, ExecOutput, ExecRequest, HandoffTarget, InstanceBackend, InstanceView,
    StateChange,
};
use hyper::Method;
use serde::Serialize;
use tracing::{debug, trace};

use crate::lxd::{self, Envelope, ExecPost, Instance, InstanceStatePut, InstancesPost, Operation};
use transport::Transport;

/// Talks to LXD directly; only the final handoff goes through `lxc`.
#[derive(Clone)]
pub struct LxdSocket {
    transport: Transport,
    lxc: String,
}

impl LxdSocket {
    /// `lxc` names the program used for the process handoff.
    pub fn new(socket: impl Into<PathBuf>, lxc: impl Into<String>) -> Self {
        Self {
            transport: Transport::new(socket.into()),
            lxc: lxc.into(),
        }
    }

    pub fn socket(&self) -> &Path {
        self.transport.socket()
    }

    async fn call(
        &self,
        op: &'static str,
        target: &str,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> Result<Envelope, BackendError> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| BackendError::Protocol(format!("encode request: {e}")))?;
        self.transport
            .request(method, path, body)
            .await?
            .check(op, target)
    }

    /// Issues a call and, if LXD answers with a background operation, waits for it.
    async fn call_and_wait(
        &self,
        op: &'static str,
        target: &str,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> Result<(), BackendError> {
        let envelope = self.call(op, target, method, path, body).await?;
        if envelope.kind != "async" {
            return Ok(());
        }
        let operation: Operation = envelope.metadata()?;
        self.wait(op, target, &operation).await.map(drop)
    }

    async fn wait(
        &self,
        op: &'static str,
        target: &str,
        operation: &Operation,
    ) -> Result<Operation, BackendError> {
        trace!(operation = %operation.id, "waiting for operation");
        self.call(op, target, Method::GET, &operation.wait_path(), NO_BODY)
            .await?
            .metadata::<Operation>()?
            .check(op, target)
    }
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl InstanceBackend for LxdSocket {
    fn name(&self) -> &'static str {
        "lxd-socket"
    }

    async fn get_instance(&self, name: &str) -> Result<InstanceView, BackendError> {
        let instance: Instance = self
            .call("get", name, Method::GET, &lxd::instance_path(name), NO_BODY)
            .await?
            .metadata()?;
        Ok(instance.into())
    }

    async fn update_state(&self, name: &str, change: &StateChange) -> Result<(), BackendError> {
        let body = InstanceStatePut::from(change);
        debug!(instance = name, action = body.action, "changing instance state");
        self.call_and_wait(body.action, name, Method::PUT, &lxd::state_path(name), Some(&body))
            .await
    }

    async fn copy_instance(&self, source: &str, dest: &str) -> Result<(), BackendError> {
        let body = InstancesPost::copy(source, dest);
        self.call_and_wait("copy", dest, Method::POST, &lxd::instances_path(), Some(&body))
            .await
    }

    async fn delete_instance(&self, name: &str) -> Result<(), BackendError> {
        self.call_and_wait("delete", name, Method::DELETE, &lxd::instance_path(name), NO_BODY)
            .await
    }

    async fn exec(&self, name: &str, request: &ExecRequest) -> Result<ExecOutput, BackendError> {
        let body = ExecPost::streamed(request.argv());
        let operation: Operation = self
            .call("exec", name, Method::POST, &lxd::exec_path(name), Some(&body))
            .await?
            .metadata()?;
        let fds = operation.exec_fds()?;

        // LXD starts the command once every stream is attached.
        let control = self.transport.websocket(&operation.websocket_path(&fds.control)).await?;
        let stdin = self.transport.websocket(&operation.websocket_path(&fds.stdin)).await?;
        let stdout = self.transport.websocket(&operation.websocket_path(&fds.stdout)).await?;
        let stderr = self.transport.websocket(&operation.websocket_path(&fds.stderr)).await?;

        // Stdin failures are left to the operation's return code.
        let feed = stream::feed(stdin, request.stdin.as_deref());
        let drain = async {
            tokio::try_join!(stream::drain(stdout, "stdout"), stream::drain(stderr, "stderr"))
        };
        let ((), outputs) = tokio::join!(feed, drain);
        drop(control);
        let (stdout, stderr) = outputs?;

        let done = self.wait("exec", name, &operation).await?;
        Ok(ExecOutput {
            exit_code: done.exec_return()?,
            stdout,
            stderr,
        })
    }

    fn handoff_target(&self, name: &str, user: &str, command: &str) -> HandoffTarget {
        HandoffTarget::lxc_exec(&self.lxc, name, user, command)
    }
}

impl std::fmt::Debug for LxdSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LxdSocket")
            .field("socket", &self.transport.socket())
            .field("lxc", &self.lxc)
            .finish()
    }
}
