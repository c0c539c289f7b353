use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the stderr subscriber of the command-line tool.
///
/// `RUST_LOG` takes precedence. Otherwise only warnings are shown, or
/// everything down to `debug` when `verbose` is set.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout may carry piped entry content
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}
