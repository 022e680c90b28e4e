use std::{convert::Infallible, fmt, future::Future, sync::Arc, time::Duration};

use ghar_model::ReadinessConfig;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::backend::{BackendError, ExecRequest, InstanceBackend, ProcessReplacer, StateChange};

/// How [`ContainerClient::start`] decides that the guest has booted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessProbe {
    pub command: Vec<String>,
    pub sentinel: String,
    pub interval: Duration,
    /// `None` polls forever.
    pub timeout: Option<Duration>,
}

impl From<&ReadinessConfig> for ReadinessProbe {
    fn from(cfg: &ReadinessConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            sentinel: cfg.sentinel.clone(),
            interval: cfg.interval(),
            timeout: cfg.timeout(),
        }
    }
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

/// Container backend client shared by every lifecycle step.
///
/// Built once around a single binding and injected into the driver.
#[derive(Clone)]
pub struct ContainerClient {
    backend: Arc<dyn InstanceBackend>,
    replacer: Arc<dyn ProcessReplacer>,
    probe: ReadinessProbe,
    cancel: CancellationToken,
}

impl ContainerClient {
    pub fn new(backend: Arc<dyn InstanceBackend>, replacer: Arc<dyn ProcessReplacer>) -> Self {
        Self {
            backend,
            replacer,
            probe: ReadinessProbe::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_probe(mut self, probe: ReadinessProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Token that aborts in-flight waits with [`BackendError::Canceled`].
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// `false` when the backend reports not-found; other failures propagate.
    pub async fn exists(&self, name: &str) -> Result<bool, BackendError> {
        let found = self.guarded(self.backend.exists(name)).await?;
        trace!(instance = name, found, "instance lookup");
        Ok(found)
    }

    /// Removes instance `name` if it exists.
    ///
    /// A running instance is force-stopped first; an ephemeral one is gone
    /// once stopped, anything else is deleted explicitly.
    #[instrument(level = "debug", skip(self))]
    pub async fn reclaim(&self, name: &str) -> Result<(), BackendError> {
        let instance = match self.guarded(self.backend.get_instance(name)).await {
            Ok(instance) => instance,
            Err(e) if e.is_not_found() => {
                trace!(instance = name, "nothing to reclaim");
                return Ok(());
            }
            Err(e) => return Err(e.in_step("inspect instance", name)),
        };

        if !instance.status.is_stopped() {
            debug!(instance = name, status = %instance.status, "stopping instance");
            self.guarded(self.backend.update_state(name, &StateChange::stop_forced()))
                .await
                .map_err(|e| e.in_step("stop instance", name))?;
            if instance.ephemeral {
                debug!(instance = name, "ephemeral instance removed by stop");
                return Ok(());
            }
        }

        debug!(instance = name, "deleting instance");
        self.guarded(self.backend.delete_instance(name))
            .await
            .map_err(|e| e.in_step("delete instance", name))
    }

    /// Replaces whatever occupies `dest` with a fresh copy of `source`.
    ///
    /// The copy is not ephemeral: a failed run leaves it behind for inspection.
    #[instrument(level = "debug", skip(self))]
    pub async fn clone_instance(&self, source: &str, dest: &str) -> Result<(), BackendError> {
        if self.exists(dest).await? {
            info!(instance = dest, "deleting the existing instance");
            self.reclaim(dest).await?;
        }

        info!(source, instance = dest, "copying instance");
        self.guarded(self.backend.copy_instance(source, dest))
            .await
            .map_err(|e| e.in_step("copy instance", &format!("{source} to {dest}")))
    }

    /// Starts `name` and waits until the readiness probe reports the sentinel.
    #[instrument(level = "debug", skip(self))]
    pub async fn start(&self, name: &str) -> Result<(), BackendError> {
        info!(instance = name, "starting instance");
        self.guarded(self.backend.update_state(name, &StateChange::start()))
            .await
            .map_err(|e| e.in_step("start instance", name))?;

        info!(instance = name, "waiting for the instance to be fully running");
        self.wait_ready(name).await
    }

    /// Polls the readiness command until it prints the sentinel.
    ///
    /// With a timeout the deadline also covers a command that never returns.
    async fn wait_ready(&self, name: &str) -> Result<(), BackendError> {
        let Some(timeout) = self.probe.timeout else {
            return self.poll_ready(name).await;
        };
        let started = Instant::now();
        match tokio::time::timeout(timeout, self.poll_ready(name)).await {
            Ok(res) => res,
            Err(_) => Err(BackendError::ReadinessTimeout {
                name: name.to_string(),
                waited: started.elapsed(),
            }),
        }
    }

    async fn poll_ready(&self, name: &str) -> Result<(), BackendError> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let probe = ExecRequest::new(self.probe.command.iter().cloned());
            let status = self
                .exec(name, &probe)
                .await
                .map_err(|e| e.in_step("probe readiness of", name))?;
            if status == self.probe.sentinel {
                debug!(instance = name, attempt, "instance ready");
                return Ok(());
            }
            trace!(instance = name, attempt, status = %status, "instance not ready yet");

            self.guarded(async {
                tokio::time::sleep(self.probe.interval).await;
                Ok::<(), BackendError>(())
            })
            .await?;
        }
    }

    /// Runs a command inside `name` and returns its trimmed stdout.
    ///
    /// A non-zero exit becomes [`BackendError::NonZeroExit`] with both streams.
    pub async fn exec(&self, name: &str, request: &ExecRequest) -> Result<String, BackendError> {
        trace!(instance = name, argv = ?request.argv(), stdin = request.stdin.is_some(), "exec");
        let output = self.guarded(self.backend.exec(name, request)).await?;
        if output.exit_code != 0 {
            return Err(BackendError::NonZeroExit {
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Replaces the calling process with `command` running as `user` inside `name`.
    ///
    /// Returns only if the replacement could not even begin.
    pub fn exec_replacing(
        &self,
        name: &str,
        user: &str,
        command: &str,
    ) -> Result<Infallible, BackendError> {
        let target = self.backend.handoff_target(name, user, command);
        info!(instance = name, target = %target, "handing off the process");
        self.replacer.replace(&target)
    }

    /// Races `fut` against cancellation.
    async fn guarded<T, F>(&self, fut: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BackendError::Canceled),
            res = fut => res,
        }
    }
}

impl fmt::Debug for ContainerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerClient")
            .field("backend", &self.backend.name())
            .field("probe", &self.probe)
            .finish()
    }
}
