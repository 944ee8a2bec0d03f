//! Claim lifecycle graph validation.
//!
//! The graph is `∅ → Declared → Operationalized → (Observing) → Resolved`.
//! `Observing` is a pure view-model state the projector derives once a
//! claim's evaluation window opens — no event moves a
//! claim into it directly, so for the purposes of gating which *commands*
//! are legal, `Operationalized` and `Observing` are equivalent: both accept
//! further evidence or a resolution.

use ledger_contracts::claim::ClaimStatus;
use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_contracts::event::EventType;

/// Check whether `event_type` is legal given a claim's `current` status.
/// `current = None` means the claim has no prior events.
pub fn check_claim_transition(event_type: EventType, current: Option<ClaimStatus>) -> LedgerResult<()> {
    use ClaimStatus::*;
    use EventType::*;

    match (event_type, current) {
        (ClaimDeclared, None) => Ok(()),
        (ClaimDeclared, Some(_)) => Err(illegal_transition("a claim may only be declared once")),

        (ClaimOperationalized, Some(Declared)) => Ok(()),
        (ClaimOperationalized, None) => Err(illegal_transition(
            "cannot operationalize a claim that has not been declared",
        )),
        (ClaimOperationalized, Some(other)) => Err(illegal_transition(&format!(
            "cannot operationalize a claim in status {other:?}"
        ))),

        (EvidenceAdded, Some(Operationalized)) | (EvidenceAdded, Some(Observing)) => Ok(()),
        (EvidenceAdded, Some(Resolved)) => Err(illegal_transition(
            "cannot add evidence to a resolved claim",
        )),
        (EvidenceAdded, _) => Err(illegal_transition(
            "cannot add evidence before a claim is operationalized",
        )),

        (ClaimResolved, Some(Operationalized)) | (ClaimResolved, Some(Observing)) => Ok(()),
        (ClaimResolved, Some(Resolved)) => {
            Err(illegal_transition("a claim may only be resolved once"))
        }
        (ClaimResolved, _) => Err(illegal_transition(
            "cannot resolve a claim before it is operationalized",
        )),

        // Editor events are not gated by claim status; they have no claim_id.
        (EditorRegistered, _) | (EditorDeactivated, _) => Ok(()),
    }
}

fn illegal_transition(reason: &str) -> LedgerError {
    LedgerError::IllegalTransition {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_contracts::claim::ClaimStatus;
    use ledger_contracts::event::EventType;

    #[test]
    fn declare_only_legal_from_nothing() {
        assert!(check_claim_transition(EventType::ClaimDeclared, None).is_ok());
        assert!(check_claim_transition(EventType::ClaimDeclared, Some(ClaimStatus::Declared)).is_err());
    }

    #[test]
    fn operationalize_requires_declared() {
        assert!(
            check_claim_transition(EventType::ClaimOperationalized, Some(ClaimStatus::Declared))
                .is_ok()
        );
        assert!(check_claim_transition(EventType::ClaimOperationalized, None).is_err());
        assert!(check_claim_transition(
            EventType::ClaimOperationalized,
            Some(ClaimStatus::Resolved)
        )
        .is_err());
    }

    #[test]
    fn evidence_allowed_while_operationalized_or_observing() {
        assert!(
            check_claim_transition(EventType::EvidenceAdded, Some(ClaimStatus::Operationalized))
                .is_ok()
        );
        assert!(
            check_claim_transition(EventType::EvidenceAdded, Some(ClaimStatus::Observing)).is_ok()
        );
        assert!(
            check_claim_transition(EventType::EvidenceAdded, Some(ClaimStatus::Resolved)).is_err()
        );
        assert!(check_claim_transition(EventType::EvidenceAdded, None).is_err());
    }

    #[test]
    fn resolve_once_only() {
        assert!(
            check_claim_transition(EventType::ClaimResolved, Some(ClaimStatus::Operationalized))
                .is_ok()
        );
        assert!(
            check_claim_transition(EventType::ClaimResolved, Some(ClaimStatus::Resolved)).is_err()
        );
    }

    #[test]
    fn editor_events_are_ungated() {
        assert!(check_claim_transition(EventType::EditorRegistered, None).is_ok());
        assert!(check_claim_transition(EventType::EditorDeactivated, Some(ClaimStatus::Resolved)).is_ok());
    }
}
