use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::LibraryConfig;

/// Log file name prefix inside the configured log directory.
const LOG_FILE_PREFIX: &str = "qar-streaming.log";

/// Initialize structured logging for the library.
///
/// Console output and a daily-rolling log file are both optional, driven by
/// [`LibraryConfig`]. Returns the appender guard that must stay alive for
/// the file writer to flush; `None` when no log directory is configured.
///
/// A process may initialize logging only once; a second `Library` in the
/// same process silently keeps the first subscriber.
pub fn init_logging(config: &LibraryConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let console_layer = if config.enable_console_logging {
        Some(fmt::layer().with_target(true))
    } else {
        None
    };

    let (file_layer, guard) = match &config.log_directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // try_init: a host embedding several Library instances (or a test
    // harness) must not panic on the second initialization.
    let _ = registry.with(console_layer).with(file_layer).try_init();

    Ok(guard)
}
