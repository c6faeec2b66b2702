//! Tracing subscriber setup for binaries embedding the bridge.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level for this crate when `RUST_LOG` is unset.
pub const LOG_LEVEL_ENV: &str = "INVOKE_LOG";

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` wins when set. Otherwise `INVOKE_LOG` picks the level for this
/// crate (`info` by default). `LOG_FORMAT=json` switches to JSON lines. A
/// subscriber that is already installed is left alone.
pub fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_directives(
            std::env::var(LOG_LEVEL_ENV).ok().as_deref(),
        ))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

fn default_directives(level: Option<&str>) -> String {
    let level = match level {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        _ => "info",
    };
    format!("invoke_bridge={level}")
}
