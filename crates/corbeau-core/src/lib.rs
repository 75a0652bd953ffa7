// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Installs the process-wide subscriber. `RUST_LOG` wins when set; otherwise
/// everything at `default_level` and above is printed.
pub fn init_tracing(default_level: Level) {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level).into())
        .from_env_lossy();
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
