//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, events)
//! - `billing` - Payments, reconciliation, webhook verification and proration

pub mod billing;
pub mod foundation;
