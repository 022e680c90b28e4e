use std::fmt;

use url::Url;

use crate::error::{ModelError, ModelResult};

/// Repository the runner registers with, parsed from `https://<host>/<owner>/<repo...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryUrl {
    host: String,
    owner: String,
    repo: String,
}

impl RepositoryUrl {
    /// Parses and validates a repository URL.
    ///
    /// Rules:
    /// - the scheme is `https`;
    /// - the URL has a host;
    /// - at least two non-empty path segments follow the host. The first is the
    ///   owner, the rest (joined by `/`) is the repository.
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let invalid = |reason: String| ModelError::InvalidRepository {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "https" {
            return Err(invalid(format!("scheme {} is not https", url.scheme())));
        }
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(invalid("missing host".into())),
        };

        let segments: Vec<&str> = url
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let [owner, repo @ ..] = segments.as_slice() else {
            return Err(invalid(
                "not enough segments to extract the owner and repo name".into(),
            ));
        };
        if repo.is_empty() {
            return Err(invalid(
                "not enough segments to extract the owner and repo name".into(),
            ));
        }

        Ok(Self {
            host,
            owner: owner.to_string(),
            repo: repo.join("/"),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// URL passed to the agent's `--url` flag.
    pub fn runner_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.owner, self.repo)
    }

    /// REST API root for this host (github.com or GitHub Enterprise Server).
    pub fn api_base(&self) -> String {
        if self.host == "github.com" {
            "https://api.github.com".to_string()
        } else {
            format!("https://{}/api/v3", self.host)
        }
    }
}

impl fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
