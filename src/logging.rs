use crate::config::AppConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber from configuration.
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity without touching config files. Safe to call once per process;
/// later calls are ignored (useful when tests share a binary).
pub fn init_tracing(cfg: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if cfg.log_json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized, skipping");
    }
}
