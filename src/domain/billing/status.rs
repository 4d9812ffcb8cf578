//! Payment status state machine.
//!
//! Mirrors the gateway's charge lifecycle. Unrecognized gateway strings
//! collapse into `Unknown`, which stays non-terminal so a later snapshot
//! can still resolve it.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Row exists but the gateway has not reported anything yet.
    Created,

    /// Awaiting payer action (e.g. cash voucher not yet paid).
    Pending,

    /// Under review by the gateway.
    InProcess,

    /// Funds captured. Grants the subscription.
    Approved,

    /// Declined by the gateway.
    Rejected,

    /// Voided before capture.
    Cancelled,

    /// Superseded by a later plan upgrade.
    Upgraded,

    /// Gateway returned no status or one we do not recognize.
    Unknown,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 8] = [
        PaymentStatus::Created,
        PaymentStatus::Pending,
        PaymentStatus::InProcess,
        PaymentStatus::Approved,
        PaymentStatus::Rejected,
        PaymentStatus::Cancelled,
        PaymentStatus::Upgraded,
        PaymentStatus::Unknown,
    ];

    /// Wire and storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Pending => "pending",
            PaymentStatus::InProcess => "in_process",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Upgraded => "upgraded",
            PaymentStatus::Unknown => "unknown",
        }
    }

    /// Parses a gateway or storage status string. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => PaymentStatus::Created,
            "pending" => PaymentStatus::Pending,
            "in_process" => PaymentStatus::InProcess,
            "approved" => PaymentStatus::Approved,
            "rejected" => PaymentStatus::Rejected,
            "cancelled" => PaymentStatus::Cancelled,
            "upgraded" => PaymentStatus::Upgraded,
            _ => PaymentStatus::Unknown,
        }
    }

    /// Parses a status that must name a known state (configuration input).
    pub fn parse_strict(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentStatus::Approved)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        if self == target {
            // Re-delivery of the same state is always harmless.
            return true;
        }
        match self {
            Created | Pending | InProcess | Unknown => true,
            Approved => matches!(target, Upgraded),
            Rejected | Cancelled | Upgraded => false,
        }
    }

    fn valid_transitions(&self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|target| target != self && self.can_transition_to(target))
            .collect()
    }

    fn is_terminal(&self) -> bool {
        use PaymentStatus::*;
        matches!(self, Approved | Rejected | Cancelled | Upgraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_gateway_strings() {
        assert_eq!(PaymentStatus::parse("approved"), PaymentStatus::Approved);
        assert_eq!(PaymentStatus::parse("IN_PROCESS"), PaymentStatus::InProcess);
        assert_eq!(PaymentStatus::parse(" rejected "), PaymentStatus::Rejected);
    }

    #[test]
    fn parse_maps_unrecognized_to_unknown() {
        assert_eq!(PaymentStatus::parse("charged_back"), PaymentStatus::Unknown);
        assert_eq!(PaymentStatus::parse(""), PaymentStatus::Unknown);
    }

    #[test]
    fn parse_strict_rejects_unrecognized() {
        assert_eq!(PaymentStatus::parse_strict("pending"), Some(PaymentStatus::Pending));
        assert_eq!(PaymentStatus::parse_strict("refunded"), None);
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        for status in PaymentStatus::ALL {
            assert_eq!(PaymentStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::InProcess).unwrap();
        assert_eq!(json, "\"in_process\"");
    }

    #[test]
    fn non_terminal_states_can_reach_any_state() {
        for from in [
            PaymentStatus::Created,
            PaymentStatus::Pending,
            PaymentStatus::InProcess,
            PaymentStatus::Unknown,
        ] {
            assert!(!from.is_terminal());
            for to in PaymentStatus::ALL {
                assert!(from.can_transition_to(&to), "{:?} -> {:?}", from, to);
            }
        }
    }

    #[test]
    fn approved_only_moves_to_upgraded() {
        assert_eq!(
            PaymentStatus::Approved.valid_transitions(),
            vec![PaymentStatus::Upgraded]
        );
        assert!(PaymentStatus::Approved
            .transition_to(PaymentStatus::Rejected)
            .is_err());
    }

    #[test]
    fn closed_states_have_no_exits() {
        for status in [
            PaymentStatus::Rejected,
            PaymentStatus::Cancelled,
            PaymentStatus::Upgraded,
        ] {
            assert!(status.is_terminal());
            assert!(status.valid_transitions().is_empty());
            assert!(!status.can_transition_to(&PaymentStatus::Approved));
        }
    }

    #[test]
    fn self_transition_is_allowed_for_terminal_states() {
        assert!(PaymentStatus::Approved.can_transition_to(&PaymentStatus::Approved));
        assert!(PaymentStatus::Upgraded.can_transition_to(&PaymentStatus::Upgraded));
    }
}
