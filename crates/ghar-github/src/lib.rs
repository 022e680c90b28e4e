//! GitHub REST client for runner registration tokens.
use std::time::Duration;

use async_trait::async_trait;
use ghar_core::token::{TokenError, TokenProvider};
use ghar_model::{Credential, RegistrationToken, RepositoryUrl};
use reqwest::{Client, header};
use serde::Deserialize;
use tracing::{debug, instrument};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("lxd-ghar/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<String>,
}

/// Mints short-lived registration tokens through the repository actions API.
#[derive(Debug, Clone)]
pub struct GithubTokenProvider {
    api_base: String,
    client: Client,
}

impl GithubTokenProvider {
    /// `api_base` is `https://api.github.com` or an enterprise `https://<host>/api/v3`.
    pub fn new(api_base: impl Into<String>) -> Result<Self, TokenError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TokenError::Transport(e.to_string()))?;
        Ok(Self::with_client(api_base, client))
    }

    pub fn with_client(api_base: impl Into<String>, client: Client) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn endpoint(&self, repository: &RepositoryUrl) -> String {
        format!(
            "{}/repos/{}/{}/actions/runners/registration-token",
            self.api_base,
            repository.owner(),
            repository.repo()
        )
    }
}

#[async_trait]
impl TokenProvider for GithubTokenProvider {
    #[instrument(level = "debug", skip_all, fields(repository = %repository))]
    async fn registration_token(
        &self,
        repository: &RepositoryUrl,
        credential: &Credential,
    ) -> Result<RegistrationToken, TokenError> {
        let url = self.endpoint(repository);
        debug!(%url, "requesting runner registration token");

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| TokenError::Decode(e.to_string()))?;
        let token = RegistrationToken::new(parsed.token);
        Ok(match parsed.expires_at {
            Some(at) => token.with_expiry(at),
            None => token,
        })
    }
}
