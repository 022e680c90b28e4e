//! Binding that drives LXD through the `lxc` command-line tool.
use std::{io, process::Stdio};

use async_trait::async_trait;
use ghar_core::backend::{
    BackendError, ExecOutput, ExecRequest, HandoffTarget, InstanceBackend, InstanceView,
    StateChange,
};
use serde::Serialize;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, trace};

use crate::lxd::{self, Instance, InstanceStatePut, InstancesPost};

/// Runs `lxc query` for REST calls and `lxc exec` for commands.
#[derive(Debug, Clone)]
pub struct LxcCli {
    program: String,
}

impl LxcCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawns `lxc` with `args`, feeding `stdin` if given, and collects its output.
    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<ExecOutput, BackendError> {
        trace!(program = %self.program, ?args, "spawning lxc");
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            BackendError::Unavailable(format!("failed to spawn {}: {e}", self.program))
        })?;

        // Written alongside the wait: a child that exits without reading its
        // input still reports its own status.
        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(data), Some(mut pipe)) = (stdin, pipe) {
                match pipe.write_all(data.as_bytes()).await {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        trace!("lxc exited before reading all of stdin");
                    }
                    res => res?,
                }
                // Dropping the pipe closes it so the remote side sees EOF.
            }
            Ok::<(), io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// `lxc query` against `path`, waiting for background operations.
    ///
    /// Returns the printed metadata; failures stay [`BackendError::Request`].
    async fn query(
        &self,
        op: &'static str,
        target: &str,
        method: &str,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> Result<String, BackendError> {
        let args = query_args(method, path, body)?;
        let out = self.run(&args, None).await?;
        if out.exit_code == 0 {
            return Ok(out.stdout);
        }
        Err(query_error(op, target, &out.stderr))
    }
}

/// Arguments of `lxc query`; the body goes through `--data` as JSON.
fn query_args(
    method: &str,
    path: &str,
    body: Option<&impl Serialize>,
) -> Result<Vec<String>, BackendError> {
    let mut args = vec!["query".to_string()];
    if method != "GET" {
        args.extend(["--wait".to_string(), "-X".to_string(), method.to_string()]);
    }
    if let Some(body) = body {
        let data = serde_json::to_string(body)
            .map_err(|e| BackendError::Protocol(format!("encode request: {e}")))?;
        args.extend(["--data".to_string(), data]);
    }
    args.push(path.to_string());
    Ok(args)
}

/// `lxc` prints `Error: <message>` on stderr.
fn query_error(op: &'static str, target: &str, stderr: &str) -> BackendError {
    let message = stderr.trim();
    let message = message.strip_prefix("Error: ").unwrap_or(message).to_string();
    BackendError::Request {
        op,
        target: target.to_string(),
        message,
    }
}

/// A failed lookup that mentions "not found" means `name` itself is absent.
///
/// Only lookups are mapped: a copy that fails this way is missing its source,
/// not its destination.
fn lookup_error(name: &str, err: BackendError) -> BackendError {
    match err {
        BackendError::Request { ref message, .. }
            if message.to_ascii_lowercase().contains("not found") =>
        {
            BackendError::NotFound(name.to_string())
        }
        other => other,
    }
}

/// Arguments of `lxc exec`: non-interactive, so stdin is a plain pipe.
fn exec_args(name: &str, argv: Vec<String>) -> Vec<String> {
    let mut args = vec![
        "exec".to_string(),
        name.to_string(),
        "--force-noninteractive".to_string(),
        "--".to_string(),
    ];
    args.extend(argv);
    args
}

/// Body of calls without a payload.
const NO_BODY: Option<&()> = None;

#[async_trait]
impl InstanceBackend for LxcCli {
    fn name(&self) -> &'static str {
        "lxc"
    }

    async fn get_instance(&self, name: &str) -> Result<InstanceView, BackendError> {
        let raw = self
            .query("get", name, "GET", &lxd::instance_path(name), NO_BODY)
            .await
            .map_err(|e| lookup_error(name, e))?;
        let instance: Instance = serde_json::from_str(&raw)
            .map_err(|e| BackendError::Protocol(format!("instance {name}: {e}")))?;
        Ok(instance.into())
    }

    async fn update_state(&self, name: &str, change: &StateChange) -> Result<(), BackendError> {
        let body = InstanceStatePut::from(change);
        debug!(instance = name, action = body.action, "changing instance state");
        self.query(body.action, name, "PUT", &lxd::state_path(name), Some(&body))
            .await
            .map(drop)
    }

    async fn copy_instance(&self, source: &str, dest: &str) -> Result<(), BackendError> {
        let body = InstancesPost::copy(source, dest);
        self.query("copy", dest, "POST", &lxd::instances_path(), Some(&body))
            .await
            .map(drop)
    }

    async fn delete_instance(&self, name: &str) -> Result<(), BackendError> {
        self.query("delete", name, "DELETE", &lxd::instance_path(name), NO_BODY)
            .await
            .map(drop)
    }

    async fn exec(&self, name: &str, request: &ExecRequest) -> Result<ExecOutput, BackendError> {
        let args = exec_args(name, request.argv());
        self.run(&args, request.stdin.as_deref()).await
    }

    fn handoff_target(&self, name: &str, user: &str, command: &str) -> HandoffTarget {
        HandoffTarget::lxc_exec(&self.program, name, user, command)
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use ghar_core::backend::InstanceStatus;

    use super::*;

    #[test]
    fn get_is_a_plain_query() {
        let args = query_args("GET", "/1.0/instances/ci-0", NO_BODY).unwrap();
        assert_eq!(args, ["query", "/1.0/instances/ci-0"]);
    }

    #[test]
    fn mutations_wait_and_carry_json() {
        let body = InstancesPost::copy("base", "ci-0");
        let args = query_args("POST", "/1.0/instances", Some(&body)).unwrap();
        assert_eq!(
            args,
            [
                "query",
                "--wait",
                "-X",
                "POST",
                "--data",
                r#"{"name":"ci-0","source":{"type":"copy","source":"base"}}"#,
                "/1.0/instances",
            ]
        );
    }

    #[test]
    fn lookup_recognizes_not_found_in_any_wording() {
        let missing = |stderr| lookup_error("ci-0", query_error("get", "ci-0", stderr));
        assert!(missing("Error: Instance not found\n").is_not_found());
        assert!(missing("Error: not found").is_not_found());

        let err = query_error("delete", "ci-0", "Error: Instance is running\n");
        assert_eq!(err.to_string(), "delete ci-0 failed: Instance is running");
    }

    #[test]
    fn not_found_outside_a_lookup_stays_a_request_error() {
        let err = query_error("copy", "ci-0", "Error: Instance not found\n");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "copy ci-0 failed: Instance not found");
    }

    #[test]
    fn exec_separates_options_from_command() {
        let args = exec_args("ci-0", vec!["sh".into(), "-c".into(), "echo -n".into()]);
        assert_eq!(
            args,
            ["exec", "ci-0", "--force-noninteractive", "--", "sh", "-c", "echo -n"]
        );
    }

    /// Installs a fake `lxc` that answers from a shell script.
    fn fake_lxc(dir: &tempfile::TempDir, script: &str) -> LxcCli {
        let path = dir.path().join("lxc");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        LxcCli::new(path.to_string_lossy())
    }

    #[tokio::test]
    async fn parses_instance_from_query_output() {
        let dir = tempfile::tempdir().unwrap();
        let lxc = fake_lxc(
            &dir,
            r#"echo '{"name":"base","status":"Stopped","status_code":102,"ephemeral":false}'"#,
        );

        let view = lxc.get_instance("base").await.unwrap();
        assert_eq!(view.status, InstanceStatus::Stopped);
        assert!(lxc.exists("base").await.unwrap());
    }

    #[tokio::test]
    async fn missing_instance_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let lxc = fake_lxc(&dir, "echo 'Error: Instance not found' >&2; exit 1");

        assert!(!lxc.exists("ci-0").await.unwrap());
    }

    #[tokio::test]
    async fn exec_feeds_stdin_and_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        // Drop the `exec <name> --force-noninteractive --` prefix and run the rest.
        let lxc = fake_lxc(&dir, r#"shift 4; exec "$@""#);

        let request =
            ExecRequest::new(["sh", "-c", "cat; echo oops >&2; exit 4"]).with_stdin("hello");
        let out = lxc.exec("ci-0", &request).await.unwrap();
        assert_eq!(out.exit_code, 4);
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "oops\n");
    }

    #[tokio::test]
    async fn exec_keeps_exit_code_when_stdin_is_not_read() {
        let dir = tempfile::tempdir().unwrap();
        let lxc = fake_lxc(&dir, "echo 'no shell' >&2; exit 5");

        // Larger than a pipe buffer, so the writer hits a closed pipe.
        let request = ExecRequest::new(["sh"]).with_stdin("x".repeat(1 << 20));
        let out = lxc.exec("ci-0", &request).await.unwrap();
        assert_eq!(out.exit_code, 5);
        assert_eq!(out.stderr, "no shell\n");
    }

    #[tokio::test]
    async fn copy_from_missing_source_is_not_a_missing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let lxc = fake_lxc(&dir, "echo 'Error: Instance not found' >&2; exit 1");

        let err = lxc.copy_instance("base", "ci-0").await.unwrap_err();
        assert!(!err.is_not_found(), "{err}");
        assert!(matches!(err, BackendError::Request { op: "copy", .. }), "{err}");
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let lxc = LxcCli::new("/nonexistent/lxc");
        let err = lxc.get_instance("base").await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)), "{err}");
    }

    #[test]
    fn handoff_uses_configured_program() {
        let target =
            LxcCli::new("/snap/bin/lxc").handoff_target("ci-0", "ghar", "/home/ghar/runner/run.sh");
        assert_eq!(target.program, "/snap/bin/lxc");
    }
}
