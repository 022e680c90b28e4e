use std::path::PathBuf;

use clap::{Parser, builder::NonEmptyStringValueParser};
use ghar_model::{BackendKind, DEFAULT_CONFIG_PATH};
use ghar_observe::{LoggerFormat, LoggerLevel};

/// Provisions one ephemeral GitHub Actions runner in an LXD instance and
/// becomes its agent process.
#[derive(Parser, Debug)]
#[command(name = "lxd-ghar", version)]
pub struct Args {
    /// Configuration file.
    #[arg(short, long, env = "GHAR_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Container backend binding (overrides `backend.kind`).
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Log filter, e.g. `info` or `ghar_core=debug,info` (overrides `logger.level`).
    #[arg(long)]
    pub log_level: Option<LoggerLevel>,

    /// text, json or journald (overrides `logger.format`).
    #[arg(long)]
    pub log_format: Option<LoggerFormat>,

    /// Credential allowed to create runner registration tokens.
    #[arg(
        long,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub github_token: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn overrides_are_optional() {
        let args = Args::try_parse_from(["lxd-ghar", "--github-token", "ghp_x"]).unwrap();
        assert_eq!(args.github_token, "ghp_x");
        assert!(args.backend.is_none());
        assert!(args.log_level.is_none());
        assert!(args.log_format.is_none());
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "lxd-ghar",
            "--config",
            "/tmp/ghar.yml",
            "--backend",
            "socket",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--github-token",
            "ghp_x",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("/tmp/ghar.yml"));
        assert_eq!(args.backend, Some(BackendKind::Socket));
        assert_eq!(args.log_level.unwrap().as_str(), "debug");
        assert_eq!(args.log_format, Some(LoggerFormat::Json));
    }

    #[test]
    fn empty_credential_is_rejected() {
        assert!(Args::try_parse_from(["lxd-ghar", "--github-token", ""]).is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let parsed =
            Args::try_parse_from(["lxd-ghar", "--backend", "docker", "--github-token", "x"]);
        assert!(parsed.is_err());
    }
}
