use std::fmt;
use std::time::Duration;

/// Timing of one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between submitting an operation and the first status check
    pub initial_delay: Duration,
    /// Delay between two status checks
    pub interval: Duration,
    /// Give up once this much time has passed without a terminal state
    pub timeout: Duration,
}

impl PollSettings {
    pub const fn new(initial_delay: Duration, interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_delay,
            interval,
            timeout,
        }
    }

    /// No sleeping at all, only the deadline applies
    pub const fn immediate(timeout: Duration) -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, timeout)
    }
}

/// Access key pair handed to the AWS CLI
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Settings shared by every outbound call, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Region override; `None` leaves resolution to the AWS CLI
    pub region: Option<String>,
    /// Explicit credentials; `None` uses the default provider chain
    pub credentials: Option<Credentials>,
    /// Polling of remote shell commands
    pub command_polling: PollSettings,
    /// Polling of volume modifications
    pub volume_polling: PollSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            credentials: None,
            command_polling: PollSettings::new(
                Duration::from_secs(5),
                Duration::from_secs(5),
                Duration::from_secs(15 * 60),
            ),
            volume_polling: PollSettings::new(
                Duration::from_secs(10),
                Duration::from_secs(10),
                Duration::from_secs(6 * 60 * 60),
            ),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_polling.timeout = timeout;
        self
    }

    pub fn volume_timeout(mut self, timeout: Duration) -> Self {
        self.volume_polling.timeout = timeout;
        self
    }

    pub fn command_polling(mut self, settings: PollSettings) -> Self {
        self.command_polling = settings;
        self
    }

    pub fn volume_polling(mut self, settings: PollSettings) -> Self {
        self.volume_polling = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals() {
        let config = Config::new();
        assert_eq!(config.command_polling.interval, Duration::from_secs(5));
        assert_eq!(config.volume_polling.initial_delay, Duration::from_secs(10));
        assert!(config.region.is_none());
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_builder_overrides_timeouts_only() {
        let config = Config::new()
            .region(Some("eu-central-1".to_string()))
            .command_timeout(Duration::from_secs(60))
            .volume_timeout(Duration::from_secs(120));

        assert_eq!(config.region.as_deref(), Some("eu-central-1"));
        assert_eq!(config.command_polling.timeout, Duration::from_secs(60));
        assert_eq!(config.command_polling.interval, Duration::from_secs(5));
        assert_eq!(config.volume_polling.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("AKIAEXAMPLE", "very-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("very-secret"));
    }
}
