//! Tracing setup for binaries and tests.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Builds the filter: `RUST_LOG` wins, then the configured directives.
pub fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new(crate::config::default_log_filter()))
}

/// Installs the global fmt subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(settings: &LoggingSettings) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings))
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive_falls_back() {
        temp_env::with_var_unset("RUST_LOG", || {
            let settings = LoggingSettings {
                filter: "tally=notalevel".to_string(),
            };
            let filter = env_filter(&settings);
            assert!(filter.to_string().contains("tally=debug"));
        });
    }

    #[test]
    fn test_rust_log_takes_precedence() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            let filter = env_filter(&LoggingSettings::default());
            let rendered = filter.to_string();
            assert!(rendered.contains("warn"));
            assert!(!rendered.contains("tally=debug"));
        });
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(&LoggingSettings::default());
        init_tracing(&LoggingSettings::default());
    }
}
