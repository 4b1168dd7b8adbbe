use std::env;

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber for a binary.
///
/// `RUST_LOG` wins over `default_level`; `LOG_FORMAT=json` switches to
/// one JSON object per line. Logs go to stderr so stdout stays clean for
/// the report.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // A second init (tests, embedding) keeps the first subscriber.
    if json {
        let _ = fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
