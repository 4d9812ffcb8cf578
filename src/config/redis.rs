//! Redis configuration for event publication.

use serde::Deserialize;

use super::error::ValidationError;

/// Where approved-payment events are published.
///
/// An empty `url` selects the in-process bus, which only logs; useful for
/// local runs without Redis.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default)]
    pub url: String,

    /// Pub/sub channel for approved-payment events
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl RedisConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.is_configured() {
            return Ok(());
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.channel.trim().is_empty() {
            return Err(ValidationError::MissingRequired("REDIS__CHANNEL"));
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel: default_channel(),
        }
    }
}

fn default_channel() -> String {
    "payment-approved-event-topic".to_string()
}
