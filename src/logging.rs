use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, writing to stderr so stdout stays free
/// for framed replies.
///
/// With `debug` off the level is pinned to `info`. With it on, `RUST_LOG`
/// may override the default `debug` filter.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
