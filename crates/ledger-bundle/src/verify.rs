//! Bundle verification.
//!
//! Every phase runs to completion and accumulates its own failures before a
//! verdict is decided, so a caller inspecting a failing bundle sees every
//! problem in one pass rather than only the first one found.

use tracing::warn;

use ledger_contracts::event::Event;

use crate::bundle::ClaimBundle;

/// The outcome of verifying a `ClaimBundle` with no access to the live
/// ledger — only the bundle's own contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleVerdict {
    /// Every event re-hashes correctly, sequence ordering holds, and every
    /// signature verifies against its bundled editor key.
    Verified,
    /// A hash or signature mismatch was found.
    Tampered { at_sequence: u64, reason: String },
    /// The bundle is internally consistent but missing something a full
    /// verification needs — an editor key, or a sequence gap suggesting a
    /// dropped event.
    Incomplete { reason: String },
    /// The bundle's own structure is malformed (empty event list, event
    /// count mismatch, an event that doesn't belong to this claim).
    InvalidFormat { reason: String },
}

struct Failures {
    invalid_format: Vec<String>,
    tampered: Vec<(u64, String)>,
    incomplete: Vec<String>,
}

fn check_structure(bundle: &ClaimBundle, failures: &mut Failures) {
    if bundle.events.is_empty() {
        failures.invalid_format.push("bundle has no events".to_string());
        return;
    }
    if bundle.events.len() as u64 != bundle.claim.event_count {
        failures.invalid_format.push(format!(
            "claim.event_count ({}) does not match events.len() ({})",
            bundle.claim.event_count,
            bundle.events.len()
        ));
    }
    for event in &bundle.events {
        if event.claim_id != Some(bundle.claim.claim_id) {
            failures.invalid_format.push(format!(
                "event {} does not belong to claim {}",
                event.event_id, bundle.claim.claim_id
            ));
        }
    }
}

fn check_hashes(events: &[Event], failures: &mut Failures) {
    for event in events {
        let canonical = match ledger_crypto::canonicalize(&event.payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                failures.invalid_format.push(format!(
                    "event {} (sequence {}): {e}",
                    event.event_id, event.sequence_number
                ));
                continue;
            }
        };
        let recomputed =
            ledger_crypto::event_hash(&canonical, event.previous_event_hash.as_deref());
        if !ledger_crypto::hashes_equal(&recomputed, &event.event_hash) {
            warn!(sequence = event.sequence_number, "bundle hash mismatch");
            failures.tampered.push((
                event.sequence_number,
                format!(
                    "event_hash mismatch: recomputed {recomputed}, stored {}",
                    event.event_hash
                ),
            ));
        }
    }
}

/// Checks that the claim's own event subsequence is free of reordering or
/// duplication. A full cross-check against the global chain is not possible
/// from a single-claim bundle — only this claim's events are included — so
/// this is the strongest ordering property a standalone bundle can attest.
fn check_sequence_ordering(events: &[Event], failures: &mut Failures) {
    for window in events.windows(2) {
        if window[1].sequence_number <= window[0].sequence_number {
            failures.tampered.push((
                window[1].sequence_number,
                format!(
                    "event sequence is not strictly increasing: {} follows {}",
                    window[1].sequence_number, window[0].sequence_number
                ),
            ));
        }
    }
}

fn check_signatures(bundle: &ClaimBundle, failures: &mut Failures) {
    for event in &bundle.events {
        let Some(editor) = bundle.editors.get(&event.created_by) else {
            failures.incomplete.push(format!(
                "no editor key for {} (event {})",
                event.created_by, event.event_id
            ));
            continue;
        };

        match ledger_crypto::verify_signature(
            &editor.public_key,
            &event.event_hash,
            &event.editor_signature,
        ) {
            Ok(()) => {}
            Err(e) => {
                failures.tampered.push((
                    event.sequence_number,
                    format!("signature verification failed: {e}"),
                ));
            }
        }
    }
}

/// Verifies `bundle` against its own contents alone.
pub fn verify_bundle(bundle: &ClaimBundle) -> BundleVerdict {
    let mut failures = Failures { invalid_format: Vec::new(), tampered: Vec::new(), incomplete: Vec::new() };

    check_structure(bundle, &mut failures);
    if !failures.invalid_format.is_empty() {
        return BundleVerdict::InvalidFormat { reason: failures.invalid_format.join("; ") };
    }

    check_hashes(&bundle.events, &mut failures);
    check_sequence_ordering(&bundle.events, &mut failures);
    check_signatures(bundle, &mut failures);

    if !failures.tampered.is_empty() {
        let at_sequence = failures.tampered.iter().map(|(seq, _)| *seq).min().unwrap_or_default();
        let reason = failures.tampered.into_iter().map(|(_, msg)| msg).collect::<Vec<_>>().join("; ");
        return BundleVerdict::Tampered { at_sequence, reason };
    }

    if !failures.incomplete.is_empty() {
        return BundleVerdict::Incomplete { reason: failures.incomplete.join("; ") };
    }

    BundleVerdict::Verified
}
