//! State machine trait for lifecycle status enums.

use super::ValidationError;

/// Status enums that only move along an explicit transition table.
///
/// Implementors list the allowed edges; `transition_to` and `is_terminal`
/// come for free.
///
/// ```ignore
/// let next = PaymentStatus::Approved.transition_to(PaymentStatus::Upgraded)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from self to target is allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns every state reachable in one step, excluding self-loops.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition, or reports why it is not allowed.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// True when no outgoing transitions exist.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Off,
    }

    impl StateMachine for Light {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Light::*;
            matches!((self, target), (Red, Green) | (Green, Red) | (Red, Off) | (Green, Off))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Light::*;
            match self {
                Red => vec![Green, Off],
                Green => vec![Red, Off],
                Off => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_listed_edge() {
        assert_eq!(Light::Red.transition_to(Light::Green), Ok(Light::Green));
    }

    #[test]
    fn transition_to_fails_for_unlisted_edge() {
        let err = Light::Off.transition_to(Light::Red).unwrap_err();
        assert!(err.to_string().contains("Cannot transition from Off to Red"));
    }

    #[test]
    fn is_terminal_defaults_to_empty_transition_list() {
        assert!(Light::Off.is_terminal());
        assert!(!Light::Red.is_terminal());
    }
}
