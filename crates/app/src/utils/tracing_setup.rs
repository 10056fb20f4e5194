//! Subscriber installation for the binary.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";
const JSON_VAR: &str = "SHUTTLELINK_LOG_JSON";

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// filter; `SHUTTLELINK_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(JSON_VAR).is_ok_and(|value| matches!(value.as_str(), "1" | "true"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if json { builder.json().try_init() } else { builder.try_init() };

    if let Err(err) = result {
        eprintln!("tracing subscriber already installed: {err}");
    }
}
