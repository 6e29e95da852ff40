//! Console logging for one-shot commands

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingSettings};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl From<&LoggingSettings> for LoggingConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            format: settings.format.clone(),
        }
    }
}

/// Install a console subscriber without span export.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
            .try_init()
            .is_ok(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::debug!("Logging initialized with level: {}", config.level);
    }

    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = LoggingSettings {
            level: "debug".to_string(),
            format: LogFormat::Json,
        };

        let config = LoggingConfig::from(&settings);
        assert_eq!(config.level, "debug");
        assert!(matches!(config.format, LogFormat::Json));
    }

    #[test]
    fn test_second_init_is_rejected() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        };

        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
