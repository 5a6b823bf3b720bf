use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` (the `-v` count) picks the
/// level for this crate: warn, info, debug, then trace.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("conkie={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
