//! Service configuration from environment variables

use std::env;

/// Configuration for the travels service
#[derive(Debug, Clone)]
pub struct TravelsConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Cron schedule for the expiry sweep
    pub sweep_schedule: String,
    /// Endpoint of the mailer collaborator
    pub mailer_url: String,
    /// Lifetime of a pending ride request, in minutes
    pub request_ttl_minutes: i64,
}

impl TravelsConfig {
    /// Create a new TravelsConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDR`: listen address (default: "0.0.0.0:3000")
    /// - `SWEEP_SCHEDULE`: cron expression (default: every 5 minutes)
    /// - `MAILER_URL`: mailer endpoint (default: local mailer)
    /// - `REQUEST_TRAVEL_TTL_MINUTES`: request lifetime (default: 30)
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var("BIND_ADDR").ok(),
            env::var("SWEEP_SCHEDULE").ok(),
            env::var("MAILER_URL").ok(),
            env::var("REQUEST_TRAVEL_TTL_MINUTES").ok(),
        )
    }

    fn from_vars(
        bind_addr: Option<String>,
        sweep_schedule: Option<String>,
        mailer_url: Option<String>,
        request_ttl_minutes: Option<String>,
    ) -> Self {
        Self {
            bind_addr: bind_addr.unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            sweep_schedule: sweep_schedule.unwrap_or_else(|| "0 */5 * * * *".to_string()),
            mailer_url: mailer_url.unwrap_or_else(|| "http://localhost:8025/send".to_string()),
            request_ttl_minutes: request_ttl_minutes
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TravelsConfig::from_vars(None, None, None, None);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.sweep_schedule, "0 */5 * * * *");
        assert_eq!(config.request_ttl_minutes, 30);
    }

    #[test]
    fn test_config_overrides() {
        let config = TravelsConfig::from_vars(
            Some("127.0.0.1:8080".to_string()),
            Some("0 * * * * *".to_string()),
            Some("http://mailer:8025/send".to_string()),
            Some("45".to_string()),
        );
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.sweep_schedule, "0 * * * * *");
        assert_eq!(config.mailer_url, "http://mailer:8025/send");
        assert_eq!(config.request_ttl_minutes, 45);
    }

    #[test]
    fn test_config_ignores_unparsable_ttl() {
        let config = TravelsConfig::from_vars(None, None, None, Some("soon".to_string()));
        assert_eq!(config.request_ttl_minutes, 30);
    }
}
