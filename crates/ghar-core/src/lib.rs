//! Provisioning core: backend capability, token seam and the runner lifecycle driver.
pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod shell;
pub mod token;

pub mod prelude {
    pub use crate::backend::{
        BackendError, ContainerClient, ExecOutput, ExecRequest, HandoffTarget, InstanceBackend,
        InstanceStatus, InstanceView, ProcessReplacer, ReadinessProbe, StateAction, StateChange,
    };
    pub use crate::error::LifecycleError;
    pub use crate::lifecycle::{Lifecycle, LifecycleState, Runner};
    pub use crate::token::{TokenError, TokenProvider};
}
