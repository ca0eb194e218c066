use tracing_subscriber::EnvFilter;

pub struct Logger;

impl Logger {
    /// Installs the global fmt subscriber. `RUST_LOG` wins over the
    /// configured level when set.
    pub fn init(log_level: &str) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}
