mod cli;

use std::{convert::Infallible, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use ghar_core::prelude::*;
use ghar_exec::ExecReplacer;
use ghar_github::GithubTokenProvider;
use ghar_model::{Config, Credential};
use ghar_observe::{init_local_offset, init_logger};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::Args;

fn main() -> ExitCode {
    // Must run before any thread is spawned.
    init_local_offset();
    let args = Args::parse();

    let config = match setup(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lxd-ghar: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")
        .and_then(|runtime| runtime.block_on(run(args, config)));
    match outcome {
        Ok(never) => match never {},
        Err(e) => {
            error!(error = %format!("{e:#}"), "lxd-ghar failed");
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration, applies command-line overrides and starts logging.
fn setup(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(kind) = args.backend {
        config.backend.kind = kind;
    }

    let logger = config
        .logger
        .clone()
        .with_overrides(args.log_level.clone(), args.log_format);
    init_logger(&logger).context("failed to initialize logger")?;
    Ok(config)
}

/// Provisions the runner; only returns on failure.
async fn run(args: Args, config: Config) -> anyhow::Result<Infallible> {
    let repository = config.repository_url()?;
    info!(
        repository = %repository,
        runner = %config.runner.name,
        image = %config.runner.image,
        backend = ?config.backend.kind,
        "starting"
    );

    let backend =
        ghar_exec::connect(&config.backend).context("failed to set up the container backend")?;
    let cancel = CancellationToken::new();
    watch_signals(cancel.clone())?;

    let client = ContainerClient::new(backend, Arc::new(ExecReplacer))
        .with_probe(ReadinessProbe::from(&config.readiness))
        .with_cancellation(cancel);
    let tokens = GithubTokenProvider::new(repository.api_base())
        .context("failed to set up the GitHub client")?;

    let lifecycle = Lifecycle::new(client, Arc::new(tokens), config.agent.clone());
    let runner = Runner::new(repository, &config.runner);
    let credential = Credential::new(args.github_token);

    Ok(lifecycle.run(runner, &credential).await?)
}

/// Cancels in-flight backend waits on SIGINT or SIGTERM.
fn watch_signals(cancel: CancellationToken) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => warn!(signal = "SIGINT", "canceling"),
            _ = terminate.recv() => warn!(signal = "SIGTERM", "canceling"),
        }
        cancel.cancel();
    });
    Ok(())
}
