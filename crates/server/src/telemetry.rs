use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for a server binary.
///
/// `RUST_LOG` controls filtering (default `info`). Safe to call once per
/// process; a second call is a no-op because the global default is already
/// set.
pub fn init_telemetry() {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
