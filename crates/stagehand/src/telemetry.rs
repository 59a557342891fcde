//! Opt-in `tracing` subscriber bootstrap.
//!
//! Library code only emits events (`debug!`, `info!`, `warn!`); whether and
//! how they are rendered is the embedder's choice. [`init()`] installs a
//! plain fmt subscriber honoring `RUST_LOG`, for embedders that don't bring
//! their own.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a fmt subscriber filtered by `RUST_LOG` (default: `info`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
