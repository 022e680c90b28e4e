//! Registration token seam between the lifecycle and the CI coordination service.
use async_trait::async_trait;
use ghar_model::{Credential, RegistrationToken, RepositoryUrl};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Issues one-time runner registration tokens.
///
/// Implementations perform a single authenticated call; there is no retry.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn registration_token(
        &self,
        repository: &RepositoryUrl,
        credential: &Credential,
    ) -> Result<RegistrationToken, TokenError>;
}
