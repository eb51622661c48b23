//! Shared HTTP client for upstream WMS fetches.

use std::time::Duration;

use reqwest::Client;

use crate::error::EngineResult;

/// Tunables for the process-wide WMS client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Overall per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Idle pooled connections kept per host.
    pub max_idle_per_host: usize,
    /// How long an idle pooled connection is kept, in seconds.
    pub idle_conn_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_idle_per_host: 100,
            idle_conn_timeout_secs: 90,
        }
    }
}

/// Build the pooled client. Safe to share across tasks; build it once at
/// startup.
pub fn build_client(config: &HttpClientConfig) -> EngineResult<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_max_idle_per_host(config.max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(config.idle_conn_timeout_secs))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let client = build_client(&HttpClientConfig::default());
        assert!(client.is_ok());
    }
}
