//! Plan Billing - subscription plan payments against a hosted gateway.
//!
//! Keeps a local payment ledger consistent with the gateway despite
//! duplicated, delayed or lost webhook notifications. Two update paths
//! feed one reconciliation function: signed webhooks and a periodic
//! sweep over unsettled payments. Plan upgrades are charged pro rata.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
