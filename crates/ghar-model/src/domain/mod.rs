mod labels;
pub use labels::Labels;

mod repository;
pub use repository::RepositoryUrl;

mod secret;
pub use secret::{Credential, RegistrationToken};

mod constants;
pub use constants::{DEFAULT_CONFIG_PATH, HOST_ARCH, RUNNER_INDEX};
