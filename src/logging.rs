use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber used by the binaries.
///
/// Library code logs through `log`; the subscriber's log bridge picks those
/// records up. `RUST_LOG` overrides the default `warn` level.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
