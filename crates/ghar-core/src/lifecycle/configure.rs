use ghar_model::{AgentConfig, Labels, RegistrationToken, RepositoryUrl};

use crate::shell::quote_command;

/// Shell line that registers the agent unattended, ephemeral and replacing
/// any previous registration with the same name.
///
/// Every argument is quoted, so tokens and labels cannot change the
/// structure of the command.
pub fn configure_command(
    agent: &AgentConfig,
    repository: &RepositoryUrl,
    labels: &Labels,
    token: &RegistrationToken,
) -> String {
    let url = repository.runner_url();
    let labels = labels.to_csv();
    quote_command([
        agent.config_script.as_str(),
        "--unattended",
        "--ephemeral",
        "--replace",
        "--url",
        url.as_str(),
        "--token",
        token.expose(),
        "--labels",
        labels.as_str(),
    ])
}
