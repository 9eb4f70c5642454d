use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: `RUST_LOG` directives on top of an `info`
/// default, written to stderr so stdout stays free for results.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
