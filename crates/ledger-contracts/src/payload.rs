//! Payload schemas for the six ingress commands.
//!
//! The ledger core enforces the *structural* rules spelled out here
//! (required fields, value ranges, enum membership) but is agnostic to what
//! claims mean — nothing downstream of `validate()` inspects field
//! semantics. Claim-domain schema beyond these shapes is explicitly out of
//! scope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

fn require_min_len(field: &str, value: &str, min: usize) -> LedgerResult<()> {
    if value.trim().len() < min {
        return Err(LedgerError::ValidationError {
            reason: format!("'{field}' must be at least {min} characters"),
        });
    }
    Ok(())
}

fn require_non_empty<T>(field: &str, items: &[T]) -> LedgerResult<()> {
    if items.is_empty() {
        return Err(LedgerError::ValidationError {
            reason: format!("'{field}' must not be empty"),
        });
    }
    Ok(())
}

/// `claim_type` values accepted by `CLAIM_DECLARED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Predictive,
    Descriptive,
    Causal,
}

/// The scope triple attached to a declared claim (who/where/when the claim
/// was made). The ledger core stores this verbatim without interpreting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTriple {
    pub subject: String,
    pub jurisdiction: String,
    pub made_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDeclaredPayload {
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub claim_type: ClaimType,
    pub scope: ScopeTriple,
}

impl ClaimDeclaredPayload {
    pub fn validate(&self) -> LedgerResult<()> {
        require_min_len("statement", &self.statement, 10)
    }
}

/// `direction_of_change` values accepted by `CLAIM_OPERATIONALIZED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionOfChange {
    Increase,
    Decrease,
    NoChange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimOperationalizedPayload {
    pub outcome_description: String,
    pub metrics: Vec<String>,
    pub direction_of_change: DirectionOfChange,
    pub start_date: String,
    pub evaluation_date: String,
    pub tolerance_window_days: u32,
    pub success_conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partial_conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_conditions: Vec<String>,
}

impl ClaimOperationalizedPayload {
    pub fn validate(&self) -> LedgerResult<()> {
        require_non_empty("metrics", &self.metrics)?;
        require_non_empty("success_conditions", &self.success_conditions)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceAddedPayload {
    pub source_url: String,
    pub source_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub source_type: String,
    pub evidence_type: String,
    pub summary: String,
    pub supports_claim: bool,
    /// Decimal string in `[0, 1]`, never a binary float.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<String>,
}

impl EvidenceAddedPayload {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.source_url.trim().is_empty() {
            return Err(LedgerError::ValidationError {
                reason: "'source_url' must not be empty".to_string(),
            });
        }
        if let Some(score) = &self.confidence_score {
            let parsed: f64 = score.parse().map_err(|_| LedgerError::ValidationError {
                reason: format!("'confidence_score' is not a decimal string: {score}"),
            })?;
            if !(0.0..=1.0).contains(&parsed) {
                return Err(LedgerError::ValidationError {
                    reason: format!("'confidence_score' {score} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}

/// `resolution` values accepted by `CLAIM_RESOLVED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Met,
    PartiallyMet,
    NotMet,
    Inconclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResolvedPayload {
    pub resolution: Resolution,
    pub resolution_summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supporting_evidence_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_details: Option<String>,
}

impl ClaimResolvedPayload {
    pub fn validate(&self) -> LedgerResult<()> {
        require_min_len("resolution_summary", &self.resolution_summary, 20)?;
        if self.resolution != Resolution::Inconclusive && self.supporting_evidence_ids.is_empty() {
            return Err(LedgerError::ValidationError {
                reason: "'supporting_evidence_ids' is required when resolution != inconclusive"
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorRegisteredPayload {
    /// Identity assigned to the new editor by the caller, mirroring how
    /// claim commands carry their own `claim_id` rather than having the
    /// service mint one. Distinct from the command's `editor_id`, which
    /// identifies whoever is authoring this registration.
    pub editor_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: String,
    /// Base64-encoded Ed25519 public key for the new editor.
    pub public_key: String,
}

impl EditorRegisteredPayload {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.username.trim().is_empty() {
            return Err(LedgerError::ValidationError {
                reason: "'username' must not be empty".to_string(),
            });
        }
        if self.public_key.trim().is_empty() {
            return Err(LedgerError::ValidationError {
                reason: "'public_key' must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorDeactivatedPayload {
    pub editor_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EditorDeactivatedPayload {
    pub fn validate(&self) -> LedgerResult<()> {
        Ok(())
    }
}
