use tracing_subscriber::EnvFilter;

/// Info-level for this crate by default; `RUST_LOG` overrides as usual.
const DEFAULT_DIRECTIVE: &str = concat!(env!("CARGO_CRATE_NAME"), "=info");

pub fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive(DEFAULT_DIRECTIVE.parse().unwrap_or_else(|_| "info".parse().unwrap()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
