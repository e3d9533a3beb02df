use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `component` and this crate log at INFO.
/// Fails if a subscriber is already installed.
pub fn init_logger(component: &str) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={},{}={}",
            component,
            Level::INFO,
            env!("CARGO_CRATE_NAME"),
            Level::INFO
        ))
    });

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}
