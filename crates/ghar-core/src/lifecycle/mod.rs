//! Provisioning driver: one ephemeral runner from base image to process handoff.
mod configure;
pub use configure::configure_command;

mod runner;
pub use runner::Runner;

mod state;
pub use state::LifecycleState;

use std::{convert::Infallible, sync::Arc};

use ghar_model::{AgentConfig, Credential};
use tracing::{error, info, instrument};

use crate::{
    backend::{BackendError, ContainerClient, ExecRequest},
    error::LifecycleError,
    token::TokenProvider,
};

/// Drives a [`Runner`] through its states.
///
/// Steps run strictly in order and are not retried. Nothing is cleaned up on
/// failure: a half-provisioned instance is left for inspection and reclaimed
/// by the next run.
pub struct Lifecycle {
    client: ContainerClient,
    tokens: Arc<dyn TokenProvider>,
    agent: AgentConfig,
}

impl Lifecycle {
    pub fn new(
        client: ContainerClient,
        tokens: Arc<dyn TokenProvider>,
        agent: AgentConfig,
    ) -> Self {
        Self {
            client,
            tokens,
            agent,
        }
    }

    pub fn client(&self) -> &ContainerClient {
        &self.client
    }

    /// Runs every step and replaces the calling process with the agent.
    ///
    /// Returns only on failure; the error names the step that failed.
    #[instrument(level = "debug", skip_all, fields(runner = %runner.name()))]
    pub async fn run(
        &self,
        runner: Runner,
        credential: &Credential,
    ) -> Result<Infallible, LifecycleError> {
        let mut runner = runner;
        let mut progress = Progress::new(runner.name());

        let outcome = self.drive(&mut runner, credential, &mut progress).await;
        if let Err(e) = &outcome {
            progress.fail(e);
        }
        outcome
    }

    async fn drive(
        &self,
        runner: &mut Runner,
        credential: &Credential,
        progress: &mut Progress,
    ) -> Result<Infallible, LifecycleError> {
        self.check_image(runner).await?;
        progress.enter(LifecycleState::Created);

        let token = self
            .tokens
            .registration_token(runner.repository(), credential)
            .await
            .map_err(|source| LifecycleError::Token {
                repository: runner.repository().to_string(),
                source,
            })?;
        runner.set_token(token);
        progress.enter(LifecycleState::TokenObtained);

        self.client
            .clone_instance(runner.image(), runner.name())
            .await
            .map_err(|source| LifecycleError::Clone {
                name: runner.name().to_string(),
                source,
            })?;
        progress.enter(LifecycleState::Cloned);

        self.client
            .start(runner.name())
            .await
            .map_err(|source| LifecycleError::Start {
                name: runner.name().to_string(),
                source,
            })?;
        progress.enter(LifecycleState::Ready);

        self.configure(runner).await?;
        progress.enter(LifecycleState::Configured);

        info!(runner = runner.name(), "executing the runner");
        self.client
            .exec_replacing(runner.name(), &self.agent.user, &self.agent.run_script)
            .map_err(|source| LifecycleError::Handoff {
                name: runner.name().to_string(),
                source,
            })
    }

    /// The base image must exist before anything is mutated.
    async fn check_image(&self, runner: &Runner) -> Result<(), LifecycleError> {
        let found = self
            .client
            .exists(runner.image())
            .await
            .map_err(|source| LifecycleError::ImageLookup {
                image: runner.image().to_string(),
                source,
            })?;
        if !found {
            return Err(LifecycleError::MissingImage {
                image: runner.image().to_string(),
            });
        }
        Ok(())
    }

    /// Registers the agent inside the instance.
    ///
    /// The command travels on stdin of the agent user's login shell, never on
    /// the backend argv, so the token does not show up in process listings.
    async fn configure(&self, runner: &Runner) -> Result<(), LifecycleError> {
        let fail = |source: BackendError| LifecycleError::Configure {
            name: runner.name().to_string(),
            source,
        };
        let Some(token) = runner.token() else {
            return Err(fail(BackendError::Protocol(
                "no registration token".into(),
            )));
        };

        info!(runner = runner.name(), "configuring the runner");
        let command = configure_command(&self.agent, runner.repository(), runner.labels(), token);
        let request = ExecRequest::new(Vec::<String>::new())
            .as_user(&self.agent.user, &self.agent.shell)
            .with_stdin(command);
        let stdout = self.client.exec(runner.name(), &request).await.map_err(fail)?;
        if !stdout.is_empty() {
            info!(runner = runner.name(), output = %stdout, "runner configured");
        }
        Ok(())
    }
}

/// Tracks and logs state transitions of one run.
struct Progress {
    runner: String,
    state: Option<LifecycleState>,
}

impl Progress {
    fn new(runner: &str) -> Self {
        Self {
            runner: runner.to_string(),
            state: None,
        }
    }

    fn enter(&mut self, to: LifecycleState) {
        debug_assert!(
            self.state.map_or(to == LifecycleState::Created, |from| from.can_advance_to(to)),
            "illegal transition {:?} -> {to}",
            self.state
        );
        info!(runner = %self.runner, state = %to, "runner state changed");
        self.state = Some(to);
    }

    fn fail(&mut self, err: &LifecycleError) {
        error!(
            runner = %self.runner,
            reached = %err.reached(),
            state = %LifecycleState::Failed,
            error = %err,
            "runner provisioning failed"
        );
        self.state = Some(LifecycleState::Failed);
    }
}
