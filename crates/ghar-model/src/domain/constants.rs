//! Well-known values shared by the binary and the lifecycle driver.

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lxd-ghar/config.yml";

/// Sequence index appended to the runner base name.
///
/// One runner per invocation, so the derived instance name is always `<name>-0`.
pub const RUNNER_INDEX: u32 = 0;

/// Architecture label advertised by every runner (e.g. `x86_64`, `aarch64`).
pub const HOST_ARCH: &str = std::env::consts::ARCH;
