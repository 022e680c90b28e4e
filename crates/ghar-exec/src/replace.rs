use std::{convert::Infallible, process::Command};

use ghar_core::backend::{BackendError, HandoffTarget, ProcessReplacer};
use tracing::debug;

/// Replaces the current process with the handoff target via `execvp`-style lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecReplacer;

impl ProcessReplacer for ExecReplacer {
    fn replace(&self, target: &HandoffTarget) -> Result<Infallible, BackendError> {
        let program = which::which(&target.program).map_err(|e| BackendError::Handoff {
            program: target.program.clone(),
            message: e.to_string(),
        })?;
        debug!(
            program = %program.display(),
            args = ?target.args,
            clear_env = target.clear_env,
            "exec"
        );

        let mut cmd = Command::new(&program);
        cmd.args(&target.args);
        if target.clear_env {
            cmd.env_clear();
        }
        Err(BackendError::Handoff {
            program: program.display().to_string(),
            message: exec(&mut cmd).to_string(),
        })
    }
}

#[cfg(unix)]
fn exec(cmd: &mut Command) -> std::io::Error {
    use std::os::unix::process::CommandExt;

    cmd.exec()
}

#[cfg(not(unix))]
fn exec(_cmd: &mut Command) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Unsupported, "process replacement needs a unix host")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolvable_program_fails_without_exec() {
        let target = HandoffTarget::lxc_exec("ghar-no-such-lxc", "ci-0", "ghar", "/bin/true");
        let err = ExecReplacer.replace(&target).unwrap_err();
        match err {
            BackendError::Handoff { program, .. } => assert_eq!(program, "ghar-no-such-lxc"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
