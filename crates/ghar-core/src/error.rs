use thiserror::Error;

use crate::{backend::BackendError, lifecycle::LifecycleState, token::TokenError};

/// Failure of a provisioning run, named after the step that failed.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to check for image existence {image}: {source}")]
    ImageLookup {
        image: String,
        #[source]
        source: BackendError,
    },

    #[error("lxc image {image} does not exist")]
    MissingImage { image: String },

    #[error("failed to create runner registration token for {repository}: {source}")]
    Token {
        repository: String,
        #[source]
        source: TokenError,
    },

    #[error("failed to start runner {name} because copy failed: {source}")]
    Clone {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to start runner {name}: {source}")]
    Start {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to start runner {name} because configure failed: {source}")]
    Configure {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to execute the runner {name}: {source}")]
    Handoff {
        name: String,
        #[source]
        source: BackendError,
    },
}

impl LifecycleError {
    /// Last state reached before the failure.
    pub fn reached(&self) -> LifecycleState {
        match self {
            LifecycleError::ImageLookup { .. }
            | LifecycleError::MissingImage { .. }
            | LifecycleError::Token { .. } => LifecycleState::Created,
            LifecycleError::Clone { .. } => LifecycleState::TokenObtained,
            LifecycleError::Start { .. } => LifecycleState::Cloned,
            LifecycleError::Configure { .. } => LifecycleState::Ready,
            LifecycleError::Handoff { .. } => LifecycleState::Configured,
        }
    }

    /// Backend error behind this failure, if any.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            LifecycleError::ImageLookup { source, .. }
            | LifecycleError::Clone { source, .. }
            | LifecycleError::Start { source, .. }
            | LifecycleError::Configure { source, .. }
            | LifecycleError::Handoff { source, .. } => Some(source),
            LifecycleError::MissingImage { .. } | LifecycleError::Token { .. } => None,
        }
    }
}
