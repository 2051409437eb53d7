//! Tracing bootstrap.
//!
//! The consumer embeds in a controller process that usually owns the global
//! subscriber already; `init` is for binaries and tests that run the core
//! standalone.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install a global subscriber. Verbosity 0 = info, 1 = debug, 2+ = trace;
/// `RUST_LOG` overrides. Safe to call more than once: later calls are no-ops.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
