//! LXD REST payloads shared by both bindings.
//!
//! `lxc query` prints the `metadata` part of a response, the unix socket
//! returns the whole [`Envelope`]; the bodies sent are the same either way.
use std::collections::BTreeMap;

use ghar_core::backend::{BackendError, InstanceStatus, InstanceView, StateChange};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const API_VERSION: &str = "/1.0";

pub fn instances_path() -> String {
    format!("{API_VERSION}/instances")
}

pub fn instance_path(name: &str) -> String {
    format!("{API_VERSION}/instances/{name}")
}

pub fn state_path(name: &str) -> String {
    format!("{API_VERSION}/instances/{name}/state")
}

pub fn exec_path(name: &str) -> String {
    format!("{API_VERSION}/instances/{name}/exec")
}

/// `GET /1.0/instances/<name>`, reduced to what the lifecycle reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub ephemeral: bool,
}

impl From<Instance> for InstanceView {
    fn from(i: Instance) -> Self {
        InstanceView {
            status: InstanceStatus::from_backend(&i.status),
            name: i.name,
            ephemeral: i.ephemeral,
        }
    }
}

/// `PUT /1.0/instances/<name>/state`.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatePut {
    pub action: &'static str,
    /// Seconds, `-1` for no limit.
    pub timeout: i64,
    pub force: bool,
    pub stateful: bool,
}

impl From<&StateChange> for InstanceStatePut {
    fn from(change: &StateChange) -> Self {
        Self {
            action: change.action.as_str(),
            timeout: change.timeout_secs(),
            force: change.force,
            stateful: false,
        }
    }
}

/// `POST /1.0/instances` creating `name` as a copy of another instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstancesPost {
    pub name: String,
    pub source: InstanceSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceSource {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source: String,
}

impl InstancesPost {
    pub fn copy(source: &str, dest: &str) -> Self {
        Self {
            name: dest.to_string(),
            source: InstanceSource {
                kind: "copy",
                source: source.to_string(),
            },
        }
    }
}

/// `POST /1.0/instances/<name>/exec`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecPost {
    pub command: Vec<String>,
    pub environment: BTreeMap<String, String>,
    #[serde(rename = "wait-for-websocket")]
    pub wait_for_websocket: bool,
    pub interactive: bool,
    #[serde(rename = "record-output")]
    pub record_output: bool,
}

impl ExecPost {
    /// Non-interactive exec with separate stdin/stdout/stderr websockets.
    pub fn streamed(command: Vec<String>) -> Self {
        Self {
            command,
            environment: BTreeMap::new(),
            wait_for_websocket: true,
            interactive: false,
            record_output: false,
        }
    }
}

/// Websocket secrets of a non-interactive exec operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecFds {
    #[serde(rename = "0")]
    pub stdin: String,
    #[serde(rename = "1")]
    pub stdout: String,
    #[serde(rename = "2")]
    pub stderr: String,
    pub control: String,
}

/// Top-level response of every REST call.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// `sync`, `async` or `error`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub error_code: u16,
    #[serde(default)]
    pub error: String,
    /// Operation URL of an `async` response.
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub metadata: Value,
}

impl Envelope {
    /// Turns an `error` response into a [`BackendError`]; `404` maps to not-found.
    pub fn check(self, op: &'static str, target: &str) -> Result<Self, BackendError> {
        if self.kind != "error" && self.error_code == 0 {
            return Ok(self);
        }
        if self.error_code == 404 {
            return Err(BackendError::NotFound(target.to_string()));
        }
        Err(BackendError::Request {
            op,
            target: target.to_string(),
            message: if self.error.is_empty() {
                format!("error code {}", self.error_code)
            } else {
                self.error
            },
        })
    }

    pub fn metadata<T: serde::de::DeserializeOwned>(self) -> Result<T, BackendError> {
        serde_json::from_value(self.metadata)
            .map_err(|e| BackendError::Protocol(format!("metadata: {e}")))
    }
}

/// Background operation, as embedded in `async` responses and returned by
/// `GET /1.0/operations/<id>/wait`.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub err: String,
}

impl Operation {
    pub fn wait_path(&self) -> String {
        format!("{API_VERSION}/operations/{}/wait", self.id)
    }

    pub fn websocket_path(&self, secret: &str) -> String {
        format!("{API_VERSION}/operations/{}/websocket?secret={secret}", self.id)
    }

    /// A finished operation either succeeded (`200`) or carries its error.
    pub fn check(self, op: &'static str, target: &str) -> Result<Self, BackendError> {
        if self.status_code == 200 {
            return Ok(self);
        }
        Err(BackendError::Request {
            op,
            target: target.to_string(),
            message: if self.err.is_empty() {
                format!("operation ended with status {}", self.status)
            } else {
                self.err
            },
        })
    }

    pub fn exec_fds(&self) -> Result<ExecFds, BackendError> {
        let fds = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("fds"))
            .cloned()
            .ok_or_else(|| BackendError::Protocol("exec operation without fds".into()))?;
        serde_json::from_value(fds).map_err(|e| BackendError::Protocol(format!("exec fds: {e}")))
    }

    /// Exit status of a finished exec operation.
    pub fn exec_return(&self) -> Result<i32, BackendError> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("return"))
            .and_then(Value::as_i64)
            .and_then(|code| i32::try_from(code).ok())
            .ok_or_else(|| BackendError::Protocol("exec operation without return code".into()))
    }
}
