use std::fmt;

/// States of one provisioning run.
///
/// ```text
/// Created -> TokenObtained -> Cloned -> Ready -> Configured -> HandedOff
///    \____________\______________\________\__________\________> Failed
/// ```
///
/// `HandedOff` is never observed from inside the process: reaching it means
/// the process image has been replaced by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Identity and labels resolved, base image known to exist.
    Created,
    TokenObtained,
    Cloned,
    /// Started and past the readiness probe.
    Ready,
    Configured,
    HandedOff,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::HandedOff | LifecycleState::Failed)
    }

    /// The only successor on the success path.
    pub fn next(&self) -> Option<LifecycleState> {
        use LifecycleState::*;
        match self {
            Created => Some(TokenObtained),
            TokenObtained => Some(Cloned),
            Cloned => Some(Ready),
            Ready => Some(Configured),
            Configured => Some(HandedOff),
            HandedOff | Failed => None,
        }
    }

    /// `Failed` is reachable from every non-terminal state; otherwise only
    /// the linear successor is allowed.
    pub fn can_advance_to(&self, to: LifecycleState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == LifecycleState::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Created => "created",
            LifecycleState::TokenObtained => "token-obtained",
            LifecycleState::Cloned => "cloned",
            LifecycleState::Ready => "ready",
            LifecycleState::Configured => "configured",
            LifecycleState::HandedOff => "handed-off",
            LifecycleState::Failed => "failed",
        })
    }
}
