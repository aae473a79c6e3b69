//! Tracing setup for test processes

use std::sync::Once;

use atlas_shared_config::defaults::LOG_LEVEL;
use atlas_shared_config::{EnvProvider, LogLevel, SystemEnv};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global subscriber that writes through the test harness
///
/// `RUST_LOG` wins when set; otherwise `LOG_LEVEL` picks the level. An
/// unparseable `LOG_LEVEL` falls back to `debug`. If another subscriber is
/// already installed it is left in place.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_directive(&SystemEnv)));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}

fn level_directive(env: &impl EnvProvider) -> &'static str {
    env.get(LOG_LEVEL)
        .and_then(|value| value.parse::<LogLevel>().ok())
        .unwrap_or_default()
        .as_directive()
}
