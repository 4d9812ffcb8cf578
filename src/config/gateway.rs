//! Payment gateway configuration

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Credentials and endpoints for the payment gateway.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// REST API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for API calls
    pub access_token: String,

    /// Shared secret for webhook signatures
    pub webhook_secret: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Text shown on the payer's card statement
    #[serde(default = "default_statement_descriptor")]
    pub statement_descriptor: String,

    /// Charge description when the request has none
    #[serde(default = "default_description")]
    pub default_description: String,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.access_token.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__ACCESS_TOKEN"));
        }
        if self.webhook_secret.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__WEBHOOK_SECRET"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::GatewayUrlMustBeHttps);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: String::new(),
            webhook_secret: String::new(),
            timeout_secs: default_timeout(),
            statement_descriptor: default_statement_descriptor(),
            default_description: default_description(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("statement_descriptor", &self.statement_descriptor)
            .field("default_description", &self.default_description)
            .finish()
    }
}

fn default_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_statement_descriptor() -> String {
    "PLANBILLING".to_string()
}

fn default_description() -> String {
    "Subscription plan payment".to_string()
}
