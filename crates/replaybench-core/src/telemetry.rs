// Logging setup
//
// Console logging through tracing-subscriber with an EnvFilter. Benchmark
// binaries call `init_telemetry` once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Configuration for console logging
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name, used for the default filter
    pub service_name: String,
    /// Whether to enable console logging
    pub enable_console: bool,
    /// Log filter (e.g., "info", "debug", "replaybench_core=debug")
    pub log_filter: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "replaybench".to_string(),
            enable_console: true,
            log_filter: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
            ..Self::default()
        }
    }

    /// Filter used when none is configured
    pub fn default_filter(&self) -> String {
        format!("{}=info,replaybench_core=info,warn", self.service_name.replace('-', "_"))
    }
}

/// Initialize the global subscriber
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_telemetry(config: TelemetryConfig) {
    let filter = config
        .log_filter
        .as_ref()
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new(config.default_filter()));

    let console_layer = if config.enable_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
    } else {
        None
    };

    if tracing_subscriber::registry().with(console_layer).try_init().is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_uses_service_name() {
        let config = TelemetryConfig {
            service_name: "replaybench-cli".into(),
            ..TelemetryConfig::default()
        };
        assert_eq!(config.default_filter(), "replaybench_cli=info,replaybench_core=info,warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_telemetry(TelemetryConfig::default());
        init_telemetry(TelemetryConfig::default());
    }
}
