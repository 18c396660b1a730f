use std::time::Duration;

use core_config::{env_or_default, env_required, ConfigError, FromEnv};

/// Runtime configuration for the two drain pipelines and the HTTP surface.
///
/// Mirrors the original service's `viper` defaults (`scheduler.enabled=true`,
/// `scheduler.maxConcurrent=1`, `scheduler.maxRetryConcurrent=1`); the
/// remaining fields have no upstream default and are chosen here.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub scheduler_enabled: bool,
    pub scheduler_interval: Duration,
    pub batch_size: u64,
    pub max_concurrent: usize,
    pub max_retry_concurrent: usize,
    pub webhook_url: String,
    pub http_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl FromEnv for DispatcherConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let scheduler_enabled = parse_env("SCHEDULER_ENABLED", "true")?;
        let scheduler_interval_secs: u64 = parse_env("SCHEDULER_INTERVAL_SECS", "5")?;
        let batch_size = parse_env("SCHEDULER_BATCH_SIZE", "50")?;
        let max_concurrent = parse_env("SCHEDULER_MAX_CONCURRENT", "1")?;
        let max_retry_concurrent = parse_env("SCHEDULER_MAX_RETRY_CONCURRENT", "1")?;
        let webhook_url = env_required("WEBHOOK_URL")?;
        let http_timeout_secs: u64 = parse_env("HTTP_TIMEOUT_SECS", "10")?;
        let shutdown_timeout_secs: u64 = parse_env("SHUTDOWN_TIMEOUT_SECS", "10")?;

        Ok(Self {
            scheduler_enabled,
            scheduler_interval: Duration::from_secs(scheduler_interval_secs),
            batch_size,
            max_concurrent,
            max_retry_concurrent,
            webhook_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            shutdown_timeout: Duration::from_secs(shutdown_timeout_secs),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    env_or_default(key, default).parse().map_err(|e| ConfigError::ParseError {
        key: key.to_string(),
        details: format!("{e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_scheduler_settings() {
        temp_env::with_vars(
            [
                ("SCHEDULER_ENABLED", None::<&str>),
                ("SCHEDULER_MAX_CONCURRENT", None),
                ("SCHEDULER_MAX_RETRY_CONCURRENT", None),
                ("WEBHOOK_URL", Some("https://example.test/webhook")),
            ],
            || {
                let config = DispatcherConfig::from_env().unwrap();
                assert!(config.scheduler_enabled);
                assert_eq!(config.max_concurrent, 1);
                assert_eq!(config.max_retry_concurrent, 1);
            },
        );
    }

    #[test]
    fn webhook_url_is_required() {
        temp_env::with_var_unset("WEBHOOK_URL", || {
            let result = DispatcherConfig::from_env();
            assert!(result.is_err());
        });
    }

    #[test]
    fn overrides_are_honoured() {
        temp_env::with_vars(
            [
                ("WEBHOOK_URL", Some("https://example.test/webhook")),
                ("SCHEDULER_BATCH_SIZE", Some("25")),
                ("SCHEDULER_INTERVAL_SECS", Some("2")),
            ],
            || {
                let config = DispatcherConfig::from_env().unwrap();
                assert_eq!(config.batch_size, 25);
                assert_eq!(config.scheduler_interval, Duration::from_secs(2));
            },
        );
    }
}
