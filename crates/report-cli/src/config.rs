use analysis_orchestrator::{OrchestratorConfig, PollTiming, RetryPolicy};
use analyst_client::ClientConfig;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub orchestrator: OrchestratorConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let client_defaults = ClientConfig::default();
        let config = Self {
            client: ClientConfig::new(
                lookup("ANALYST_API_URL").unwrap_or(client_defaults.base_url),
                Duration::from_secs(parse_or(
                    &lookup,
                    "ANALYST_HTTP_TIMEOUT_SECS",
                    client_defaults.timeout.as_secs(),
                )?),
            ),
            orchestrator: OrchestratorConfig {
                poll: PollTiming {
                    interval: Duration::from_secs(parse_or(
                        &lookup,
                        "ANALYSIS_POLL_INTERVAL_SECS",
                        2,
                    )?),
                    deadline: Duration::from_secs(parse_or(
                        &lookup,
                        "ANALYSIS_DEADLINE_SECS",
                        300,
                    )?),
                },
                retry: RetryPolicy {
                    max_attempts: parse_or(&lookup, "ANALYSIS_MAX_ATTEMPTS", 3)?,
                    delay: Duration::from_secs(parse_or(
                        &lookup,
                        "ANALYSIS_RETRY_DELAY_SECS",
                        2,
                    )?),
                    auto_retry: parse_or(&lookup, "ANALYSIS_AUTO_RETRY", false)?,
                    retry_on_timeout: parse_or(&lookup, "ANALYSIS_RETRY_ON_TIMEOUT", false)?,
                },
            },
        };

        if config.orchestrator.poll.interval.is_zero() {
            anyhow::bail!("ANALYSIS_POLL_INTERVAL_SECS must be greater than zero");
        }

        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.client.base_url, "http://localhost:5000");
        assert_eq!(config.orchestrator, OrchestratorConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ANALYST_API_URL", "http://analyst:8080"),
            ("ANALYSIS_DEADLINE_SECS", "60"),
            ("ANALYSIS_AUTO_RETRY", "true"),
            ("ANALYSIS_MAX_ATTEMPTS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.client.base_url, "http://analyst:8080");
        assert_eq!(config.orchestrator.poll.deadline, Duration::from_secs(60));
        assert!(config.orchestrator.retry.auto_retry);
        assert_eq!(config.orchestrator.retry.max_attempts, 5);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = AppConfig::from_lookup(lookup(&[("ANALYSIS_AUTO_RETRY", "sometimes")]))
            .unwrap_err();
        assert!(err.to_string().contains("ANALYSIS_AUTO_RETRY"));

        assert!(AppConfig::from_lookup(lookup(&[("ANALYSIS_POLL_INTERVAL_SECS", "0")])).is_err());
    }
}
