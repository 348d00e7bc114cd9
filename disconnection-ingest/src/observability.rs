use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `disconnection_ingest=info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("disconnection_ingest=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
