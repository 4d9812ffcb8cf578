//! Reconciliation sweep configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::billing::PaymentStatus;
use crate::domain::foundation::StateMachine;

/// Settings for the periodic reconciliation sweep.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Comma-separated statuses to poll, e.g. `in_process,pending`
    #[serde(default = "default_statuses")]
    pub statuses: String,

    /// Processed webhook rows older than this are purged
    #[serde(default = "default_retention_days")]
    pub webhook_retention_days: i64,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Parses the status set. Unknown names and terminal statuses are errors.
    pub fn sweep_statuses(&self) -> Result<Vec<PaymentStatus>, ValidationError> {
        let mut statuses = Vec::new();
        for name in self.statuses.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let status = PaymentStatus::parse_strict(name)
                .ok_or_else(|| ValidationError::UnknownSweepStatus(name.to_string()))?;
            if status.is_terminal() {
                return Err(ValidationError::TerminalSweepStatus(name.to_string()));
            }
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        if statuses.is_empty() {
            return Err(ValidationError::MissingRequired("SCHEDULER__STATUSES"));
        }
        Ok(statuses)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        self.sweep_statuses()?;
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            statuses: default_statuses(),
            webhook_retention_days: default_retention_days(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    300
}

fn default_statuses() -> String {
    "in_process".to_string()
}

fn default_retention_days() -> i64 {
    30
}
