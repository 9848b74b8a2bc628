//! Logging setup.
//!
//! JSON lines on stdout, filtered through `RUST_LOG` (default
//! [`DEFAULT_FILTER`]). Audit events from the tracing notifier use the
//! `gt_server::audit` target so they can be routed separately.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Registry};

pub const DEFAULT_FILTER: &str = "gt_server=debug";

/// Install the global subscriber. Call once, before any logging.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    Registry::default()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
