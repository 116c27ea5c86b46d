use std::{env, sync::Once};

use tracing_subscriber::EnvFilter;

static LOG_INIT: Once = Once::new();

/// Install the global subscriber. `RUST_LOG` selects what is logged
/// (`info` if unset), `RUST_LOG_FORMAT=json` switches to JSON lines.
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        if env::var("RUST_LOG_FORMAT") == Ok("json".to_string()) {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(use_color())
                .init();
        }
    });
}

fn use_color() -> bool {
    env::var("NO_COLOR").map(|v| v.is_empty()).unwrap_or(true)
}
