use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a JSON subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tariff_evaluator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}

/// Human-readable output captured by the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
