//! In-memory backend and replacer used by the unit tests.
use std::{
    collections::{BTreeMap, VecDeque},
    convert::Infallible,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::backend::{
    BackendError, ExecOutput, ExecRequest, HandoffTarget, InstanceBackend, InstanceStatus,
    InstanceView, ProcessReplacer, StateAction, StateChange,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Get(String),
    UpdateState(String, StateAction),
    Copy(String, String),
    Delete(String),
    /// Instance, argv, stdin.
    Exec(String, Vec<String>, Option<String>),
}

#[derive(Default)]
struct State {
    instances: BTreeMap<String, InstanceView>,
    calls: Vec<Call>,
    probe_results: VecDeque<Result<ExecOutput, BackendError>>,
    exec_results: VecDeque<Result<ExecOutput, BackendError>>,
    probe_count: usize,
    unavailable: bool,
    fail_stop: bool,
    fail_copy: bool,
    hang_exec: bool,
}

/// Behaves like a small LXD: copies land stopped, running instances cannot
/// be deleted, exec needs a running instance.
///
/// Probe commands (the default readiness argv) answer from the scripted probe
/// queue and report `running` once it is drained; every other command answers
/// from the exec queue and succeeds with empty output once it is drained.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_instance(self, name: &str, status: InstanceStatus, ephemeral: bool) -> Self {
        self.state.lock().unwrap().instances.insert(
            name.to_string(),
            InstanceView {
                name: name.to_string(),
                status,
                ephemeral,
            },
        );
        self
    }

    pub(crate) fn with_probe_outputs<I, S>(self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_probe_results(outputs.into_iter().map(|s| {
            Ok(ExecOutput {
                exit_code: 0,
                stdout: format!("{}\n", s.into()),
                stderr: String::new(),
            })
        }))
    }

    pub(crate) fn with_probe_results<I>(self, results: I) -> Self
    where
        I: IntoIterator<Item = Result<ExecOutput, BackendError>>,
    {
        self.state.lock().unwrap().probe_results.extend(results);
        self
    }

    pub(crate) fn with_exec_results<I>(self, results: I) -> Self
    where
        I: IntoIterator<Item = Result<ExecOutput, BackendError>>,
    {
        self.state.lock().unwrap().exec_results.extend(results);
        self
    }

    /// Every call fails as if the socket were gone.
    pub(crate) fn unavailable(self) -> Self {
        self.state.lock().unwrap().unavailable = true;
        self
    }

    pub(crate) fn fail_stop(self) -> Self {
        self.state.lock().unwrap().fail_stop = true;
        self
    }

    pub(crate) fn fail_copy(self) -> Self {
        self.state.lock().unwrap().fail_copy = true;
        self
    }

    /// Exec calls are recorded and then never complete.
    pub(crate) fn hang_exec(self) -> Self {
        self.state.lock().unwrap().hang_exec = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn instance(&self, name: &str) -> Option<InstanceView> {
        self.state.lock().unwrap().instances.get(name).cloned()
    }

    pub(crate) fn instance_names(&self) -> Vec<String> {
        self.state.lock().unwrap().instances.keys().cloned().collect()
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.state.lock().unwrap().probe_count
    }

    fn hangs(&self, name: &str, request: &ExecRequest) -> Result<bool, BackendError> {
        if !self.state.lock().unwrap().hang_exec {
            return Ok(false);
        }
        let argv = request.argv();
        let readiness = is_probe(&argv);
        let mut state = self.record(Call::Exec(name.to_string(), argv, request.stdin.clone()))?;
        if readiness {
            state.probe_count += 1;
        }
        Ok(true)
    }

    fn record(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.unavailable {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        Ok(state)
    }
}

fn is_probe(argv: &[String]) -> bool {
    crate::backend::ReadinessProbe::default().command == argv
}

#[async_trait]
impl InstanceBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn get_instance(&self, name: &str) -> Result<InstanceView, BackendError> {
        let state = self.record(Call::Get(name.to_string()))?;
        state
            .instances
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    async fn update_state(&self, name: &str, change: &StateChange) -> Result<(), BackendError> {
        let mut state = self.record(Call::UpdateState(name.to_string(), change.action))?;
        if change.action == StateAction::Stop && state.fail_stop {
            return Err(BackendError::Request {
                op: "stop",
                target: name.to_string(),
                message: "operation timed out".into(),
            });
        }
        let Some(instance) = state.instances.get_mut(name) else {
            return Err(BackendError::NotFound(name.to_string()));
        };
        match change.action {
            StateAction::Start => instance.status = InstanceStatus::Running,
            StateAction::Stop => {
                instance.status = InstanceStatus::Stopped;
                if instance.ephemeral {
                    state.instances.remove(name);
                }
            }
        }
        Ok(())
    }

    async fn copy_instance(&self, source: &str, dest: &str) -> Result<(), BackendError> {
        let mut state = self.record(Call::Copy(source.to_string(), dest.to_string()))?;
        if state.fail_copy {
            return Err(BackendError::Request {
                op: "copy",
                target: dest.to_string(),
                message: "storage pool full".into(),
            });
        }
        if !state.instances.contains_key(source) {
            return Err(BackendError::NotFound(source.to_string()));
        }
        if state.instances.contains_key(dest) {
            return Err(BackendError::Request {
                op: "copy",
                target: dest.to_string(),
                message: "instance already exists".into(),
            });
        }
        state.instances.insert(
            dest.to_string(),
            InstanceView {
                name: dest.to_string(),
                status: InstanceStatus::Stopped,
                ephemeral: false,
            },
        );
        Ok(())
    }

    async fn delete_instance(&self, name: &str) -> Result<(), BackendError> {
        let mut state = self.record(Call::Delete(name.to_string()))?;
        match state.instances.get(name) {
            None => Err(BackendError::NotFound(name.to_string())),
            Some(i) if !i.status.is_stopped() => Err(BackendError::Request {
                op: "delete",
                target: name.to_string(),
                message: "instance is running".into(),
            }),
            Some(_) => {
                state.instances.remove(name);
                Ok(())
            }
        }
    }

    async fn exec(&self, name: &str, request: &ExecRequest) -> Result<ExecOutput, BackendError> {
        if self.hangs(name, request)? {
            std::future::pending::<()>().await;
        }
        let argv = request.argv();
        let mut state = self.record(Call::Exec(
            name.to_string(),
            argv.clone(),
            request.stdin.clone(),
        ))?;
        let running = state
            .instances
            .get(name)
            .map(|i| i.status == InstanceStatus::Running)
            .unwrap_or(false);
        if !running {
            return Err(BackendError::Request {
                op: "exec",
                target: name.to_string(),
                message: "instance is not running".into(),
            });
        }
        if is_probe(&argv) {
            state.probe_count += 1;
            return state.probe_results.pop_front().unwrap_or_else(|| {
                Ok(ExecOutput {
                    exit_code: 0,
                    stdout: "running\n".into(),
                    stderr: String::new(),
                })
            });
        }
        state
            .exec_results
            .pop_front()
            .unwrap_or_else(|| Ok(ExecOutput::default()))
    }

    fn handoff_target(&self, name: &str, user: &str, command: &str) -> HandoffTarget {
        HandoffTarget::lxc_exec("lxc", name, user, command)
    }
}

/// Records handoff targets instead of replacing the test process.
#[derive(Default)]
pub(crate) struct RecordingReplacer {
    targets: Mutex<Vec<HandoffTarget>>,
}

impl RecordingReplacer {
    pub(crate) fn targets(&self) -> Vec<HandoffTarget> {
        self.targets.lock().unwrap().clone()
    }
}

impl ProcessReplacer for RecordingReplacer {
    fn replace(&self, target: &HandoffTarget) -> Result<Infallible, BackendError> {
        self.targets.lock().unwrap().push(target.clone());
        Err(BackendError::Handoff {
            program: target.program.clone(),
            message: "recorded instead of replacing the test process".into(),
        })
    }
}
