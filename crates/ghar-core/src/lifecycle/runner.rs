use std::fmt;

use ghar_model::{HOST_ARCH, Labels, RUNNER_INDEX, RegistrationToken, RepositoryUrl, RunnerConfig};

/// The runner being provisioned by this process.
#[derive(Clone)]
pub struct Runner {
    repository: RepositoryUrl,
    name: String,
    image: String,
    labels: Labels,
    token: Option<RegistrationToken>,
}

impl Runner {
    /// Derives the instance name (`<name>-0`) and adds the host architecture label.
    pub fn new(repository: RepositoryUrl, config: &RunnerConfig) -> Self {
        Self {
            repository,
            name: config.instance_name(RUNNER_INDEX),
            image: config.image.clone(),
            labels: config.labels.clone().with(HOST_ARCH),
            token: None,
        }
    }

    pub fn repository(&self) -> &RepositoryUrl {
        &self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn token(&self) -> Option<&RegistrationToken> {
        self.token.as_ref()
    }

    pub(crate) fn set_token(&mut self, token: RegistrationToken) {
        self.token = Some(token);
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("repository", &self.repository.to_string())
            .field("name", &self.name)
            .field("image", &self.image)
            .field("labels", &self.labels.to_csv())
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_and_architecture_label() {
        let repo = RepositoryUrl::parse("https://github.com/o/r").unwrap();
        let cfg = RunnerConfig {
            name: "ci".into(),
            image: "base".into(),
            labels: ["self-hosted"].into_iter().collect(),
        };
        let runner = Runner::new(repo, &cfg);

        assert_eq!(runner.name(), "ci-0");
        assert_eq!(runner.image(), "base");
        assert_eq!(runner.labels().to_csv(), format!("self-hosted,{HOST_ARCH}"));
        assert!(runner.token().is_none());
    }

    #[test]
    fn configured_architecture_label_is_not_duplicated() {
        let repo = RepositoryUrl::parse("https://github.com/o/r").unwrap();
        let cfg = RunnerConfig {
            name: "ci".into(),
            image: "base".into(),
            labels: [HOST_ARCH, "gpu"].into_iter().collect(),
        };
        assert_eq!(
            Runner::new(repo, &cfg).labels().to_csv(),
            format!("{HOST_ARCH},gpu")
        );
    }
}
