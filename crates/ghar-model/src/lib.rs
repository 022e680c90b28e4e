mod domain;
pub use domain::{
    Credential, DEFAULT_CONFIG_PATH, HOST_ARCH, Labels, RegistrationToken, RepositoryUrl,
    RUNNER_INDEX,
};

mod error;
pub use error::{ModelError, ModelResult};

mod config;
pub use config::{AgentConfig, BackendConfig, BackendKind, Config, ReadinessConfig, RunnerConfig};
