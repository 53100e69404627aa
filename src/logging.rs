use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILTER_ENV: &str = "RUST_LOG";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a JSON log subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once (ex. on every warm Lambda invocation); only the
/// first call installs a subscriber.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env(LOG_FILTER_ENV)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        tracing::info!("logging initialized");
    }
}
