//! Tracing setup for the trainlaunch binary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LAUNCH_TARGETS: [&str; 3] = ["trainlaunch", "trainlaunch_core", "trainlaunch_remote"];

/// Filter used when `RUST_LOG` is unset: launch crates at `level`,
/// HTTP and runtime dependencies held at `warn`.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        LAUNCH_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str().to_lowercase())),
    );
    directives.join(",")
}

/// Install the global subscriber, writing to stderr.
///
/// Stdout carries the plan, validation report and job handle (as JSON
/// with `--json`), so log records must never interleave with it.
/// Repeat calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let records = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let records = if json {
        records.json().boxed()
    } else {
        records.boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(records)
        .with(filter)
        .try_init();
}
