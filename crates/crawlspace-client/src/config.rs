use std::time::Duration;

use crawlspace_core::CrawlError;
use crawlspace_core::middleware::DEFAULT_USER_AGENT;

/// Settings for [`ReqwestTransport`](crate::ReqwestTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Sent when the request carries no `User-Agent` header of its own.
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Read configuration from environment variables.
    ///
    /// - `CRAWLSPACE_USER_AGENT` (optional)
    /// - `CRAWLSPACE_TIMEOUT_SECS` (optional, defaults to 30)
    /// - `CRAWLSPACE_CONNECT_TIMEOUT_SECS` (optional, defaults to 10)
    pub fn from_env() -> Result<Self, CrawlError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CrawlError> {
        let defaults = Self::default();

        let user_agent = match lookup("CRAWLSPACE_USER_AGENT") {
            Some(raw) if raw.trim().is_empty() => {
                return Err(CrawlError::Configuration(
                    "CRAWLSPACE_USER_AGENT must not be empty".into(),
                ));
            }
            Some(raw) => raw,
            None => defaults.user_agent,
        };

        let timeout = secs_var(&lookup, "CRAWLSPACE_TIMEOUT_SECS")?.unwrap_or(defaults.timeout);
        let connect_timeout =
            secs_var(&lookup, "CRAWLSPACE_CONNECT_TIMEOUT_SECS")?.unwrap_or(defaults.connect_timeout);

        Ok(Self {
            user_agent,
            timeout,
            connect_timeout,
        })
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn secs_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>, CrawlError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let secs: u64 = raw.trim().parse().map_err(|_| {
        CrawlError::Configuration(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if secs == 0 {
        return Err(CrawlError::Configuration(format!("{key} must be at least 1")));
    }
    Ok(Some(Duration::from_secs(secs)))
}
