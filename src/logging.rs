use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialise logging at `info`, or at `debug` when enabled in the settings
/// file. Only with debug logging on may `RUST_LOG` override the level.
///
/// When `log_file` is given every event is also appended to that file.
/// Returns false if a global subscriber was already installed.
pub fn init(debug: bool, log_file: Option<&Path>) -> bool {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let file_layer = log_file.and_then(|path| {
        let name = path.file_name()?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let appender = tracing_appender::rolling::never(dir, name);
        Some(fmt::layer().with_ansi(false).with_writer(appender))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .is_ok()
}
