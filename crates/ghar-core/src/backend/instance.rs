use std::{fmt, time::Duration};

use crate::shell;

/// Lifecycle status reported by the container backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Stopped,
    Running,
    Frozen,
    /// Any other backend status (`Error`, `Stopping`, ...).
    Other(String),
}

impl InstanceStatus {
    /// Maps the backend status string (`"Running"`, `"Stopped"`, ...).
    pub fn from_backend(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "stopped" => Self::Stopped,
            "running" => Self::Running,
            "frozen" => Self::Frozen,
            _ => Self::Other(status.to_string()),
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("Stopped"),
            Self::Running => f.write_str("Running"),
            Self::Frozen => f.write_str("Frozen"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// The part of an instance the lifecycle cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceView {
    pub name: String,
    pub status: InstanceStatus,
    /// Ephemeral instances are deleted by the backend when they stop.
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Start,
    Stop,
}

impl StateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateAction::Start => "start",
            StateAction::Stop => "stop",
        }
    }
}

/// Requested state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub action: StateAction,
    /// `None` lets the backend wait as long as it takes.
    pub timeout: Option<Duration>,
    /// Kill the instance when a graceful stop does not converge.
    pub force: bool,
}

impl StateChange {
    pub fn start() -> Self {
        Self {
            action: StateAction::Start,
            timeout: None,
            force: false,
        }
    }

    /// Stop with an unbounded wait and forced termination.
    pub fn stop_forced() -> Self {
        Self {
            action: StateAction::Stop,
            timeout: None,
            force: true,
        }
    }

    /// Timeout in the backend's wire convention: seconds, `-1` for unbounded.
    pub fn timeout_secs(&self) -> i64 {
        self.timeout
            .map(|t| i64::try_from(t.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(-1)
    }
}

/// Command to run inside an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub command: Vec<String>,
    /// Run through the login shell of this account instead of directly.
    pub user: Option<LoginUser>,
    pub stdin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginUser {
    pub name: String,
    pub shell: String,
}

impl ExecRequest {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            user: None,
            stdin: None,
        }
    }

    pub fn as_user(mut self, user: impl Into<String>, shell: impl Into<String>) -> Self {
        self.user = Some(LoginUser {
            name: user.into(),
            shell: shell.into(),
        });
        self
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Final argv handed to the backend.
    pub fn argv(&self) -> Vec<String> {
        match &self.user {
            Some(user) => shell::login_shell_argv(&user.name, &user.shell, &self.command),
            None => self.command.clone(),
        }
    }
}

/// Raw result of an in-instance command; a non-zero exit is not an error here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Program and arguments the calling process is replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffTarget {
    /// Program name, resolved on `PATH` by the replacer.
    pub program: String,
    pub args: Vec<String>,
    /// Start the program with an empty environment.
    pub clear_env: bool,
}

impl HandoffTarget {
    /// `lxc exec <name> -- su -l -s <command> <user>`.
    ///
    /// `command` is installed as the login shell of `user` for this session,
    /// so it runs with the account's login environment and without any shell
    /// parsing of its path.
    pub fn lxc_exec(lxc: &str, name: &str, user: &str, command: &str) -> Self {
        Self {
            program: lxc.to_string(),
            args: vec![
                "exec".to_string(),
                name.to_string(),
                "--".to_string(),
                "su".to_string(),
                "-l".to_string(),
                "-s".to_string(),
                command.to_string(),
                user.to_string(),
            ],
            clear_env: true,
        }
    }
}

impl fmt::Display for HandoffTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell::quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell::quote(arg))?;
        }
        Ok(())
    }
}
