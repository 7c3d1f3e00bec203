//! Log output of the command line tool
use tracing_subscriber::EnvFilter;

/// Default filter if `RUST_LOG` is not set
///
/// Everything at `info` and above is shown.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a `fmt` subscriber that writes to stderr
///
/// The filter is read from `RUST_LOG` and falls back to [`DEFAULT_FILTER`].
/// Calling this more than once is harmless, later calls are ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
