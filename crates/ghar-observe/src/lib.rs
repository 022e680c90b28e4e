//! Logging bootstrap for `lxd-ghar`.
//!
//! Everything in the workspace logs through `tracing`; this crate only decides
//! where those events go (terminal text, JSON lines or journald) and how they are
//! filtered and timestamped.
mod logger;
pub use logger::*;
