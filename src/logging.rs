/// Tracing subscriber setup
///
/// Console output goes to stderr so stdout stays reserved for decoded messages.
/// `RUST_LOG` overrides the configured level.

use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "itch-feed-handler";

/// Install the global subscriber. Call once, before any worker thread starts.
///
/// With `log_dir` set, a second non-ANSI layer writes daily-rotated files there.
pub fn init_logging(log_level: &str, log_dir: Option<&str>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(true);

    let file_layer = log_dir.map(|dir| {
        fmt::layer()
            .with_writer(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
