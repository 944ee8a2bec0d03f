//! Ed25519 signing for editor identities.
//!
//! Keys are held as `ed25519_dalek::SigningKey`/`VerifyingKey` and encoded
//! as base64 at rest using `base64::engine::general_purpose::STANDARD`. The
//! message signed is always the raw 32 bytes of an event hash, never its
//! hex string — verifiers must hex-decode before calling `verify`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use ledger_contracts::error::{LedgerError, LedgerResult};
use rand::rngs::OsRng;
use std::fs;
use std::path::Path;
use tracing::warn;

/// An Ed25519 keypair used to sign event hashes.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Reconstruct a keypair from a base64-encoded 32-byte seed.
    pub fn from_base64_seed(seed_b64: &str) -> LedgerResult<Self> {
        let bytes = BASE64
            .decode(seed_b64.trim())
            .map_err(|e| LedgerError::ConfigError {
                reason: format!("invalid base64 seed: {e}"),
            })?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| LedgerError::ConfigError {
            reason: "seed must decode to exactly 32 bytes".to_string(),
        })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Base64-encode the raw 32-byte seed, for persisting to disk.
    pub fn seed_base64(&self) -> String {
        BASE64.encode(self.signing_key.to_bytes())
    }

    /// Base64-encode the public key, the form stored on `Editor::public_key`.
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign the raw 32 bytes of a lowercase-hex event hash.
    ///
    /// Hex-decodes `event_hash_hex` before signing — the signature commits
    /// to the hash's binary value, not its textual hex representation.
    pub fn sign_hash(&self, event_hash_hex: &str) -> LedgerResult<String> {
        let hash_bytes = decode_hash_hex(event_hash_hex)?;
        let signature: Signature = self.signing_key.sign(&hash_bytes);
        Ok(BASE64.encode(signature.to_bytes()))
    }
}

/// Decode a lowercase-hex SHA-256 hash into its raw 32 bytes.
fn decode_hash_hex(event_hash_hex: &str) -> LedgerResult<[u8; 32]> {
    let bytes = hex::decode(event_hash_hex).map_err(|e| LedgerError::SignatureInvalid {
        reason: format!("event_hash is not valid hex: {e}"),
    })?;
    bytes.try_into().map_err(|_| LedgerError::SignatureInvalid {
        reason: "event_hash must decode to exactly 32 bytes".to_string(),
    })
}

/// Verify `signature_b64` over `event_hash_hex` against `public_key_b64`.
///
/// Returns `Ok(())` on a valid signature, `Err(LedgerError::SignatureInvalid)`
/// otherwise — including malformed base64/hex input, which is treated as an
/// invalid signature rather than a panic.
pub fn verify(public_key_b64: &str, event_hash_hex: &str, signature_b64: &str) -> LedgerResult<()> {
    let public_key_bytes = BASE64
        .decode(public_key_b64.trim())
        .map_err(|e| LedgerError::SignatureInvalid {
            reason: format!("invalid base64 public key: {e}"),
        })?;
    let public_key_bytes: [u8; 32] =
        public_key_bytes
            .try_into()
            .map_err(|_| LedgerError::SignatureInvalid {
                reason: "public key must decode to exactly 32 bytes".to_string(),
            })?;
    let verifying_key =
        VerifyingKey::from_bytes(&public_key_bytes).map_err(|e| LedgerError::SignatureInvalid {
            reason: format!("invalid public key: {e}"),
        })?;

    let signature_bytes = BASE64
        .decode(signature_b64.trim())
        .map_err(|e| LedgerError::SignatureInvalid {
            reason: format!("invalid base64 signature: {e}"),
        })?;
    let signature_bytes: [u8; 64] =
        signature_bytes
            .try_into()
            .map_err(|_| LedgerError::SignatureInvalid {
                reason: "signature must decode to exactly 64 bytes".to_string(),
            })?;
    let signature = Signature::from_bytes(&signature_bytes);

    let hash_bytes = decode_hash_hex(event_hash_hex)?;

    verifying_key
        .verify(&hash_bytes, &signature)
        .map_err(|e| LedgerError::SignatureInvalid {
            reason: format!("signature verification failed: {e}"),
        })
}

/// A process-wide keypair used to sign events not directly attributable to
/// a human editor (automated anchoring bookkeeping, genesis editor
/// registration). If no key file is supplied, an ephemeral keypair is
/// generated and a warning is logged: signatures from it will not verify
/// against a freshly started process.
pub struct SystemKeypair {
    pub keypair: Keypair,
    pub persisted: bool,
}

impl SystemKeypair {
    /// Load the seed from `path` if given and present, otherwise generate a
    /// fresh ephemeral keypair.
    pub fn load_or_generate(path: Option<&Path>) -> LedgerResult<Self> {
        if let Some(path) = path {
            if path.exists() {
                let seed_b64 = fs::read_to_string(path).map_err(|e| LedgerError::ConfigError {
                    reason: format!("failed to read system key file '{}': {e}", path.display()),
                })?;
                let keypair = Keypair::from_base64_seed(&seed_b64)?;
                return Ok(Self {
                    keypair,
                    persisted: true,
                });
            }
        }

        warn!(
            "no system key file configured or found; generating an ephemeral system keypair. \
             Signatures it produces will not verify after this process restarts."
        );
        Ok(Self {
            keypair: Keypair::generate(),
            persisted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    fn sample_hash_hex() -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"sample event bytes");
        hex::encode(hasher.finalize())
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let keypair = Keypair::generate();
        let hash = sample_hash_hex();
        let signature = keypair.sign_hash(&hash).unwrap();
        assert!(verify(&keypair.public_key_base64(), &hash, &signature).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let keypair = Keypair::generate();
        let other = Keypair::generate();
        let hash = sample_hash_hex();
        let signature = keypair.sign_hash(&hash).unwrap();
        assert!(verify(&other.public_key_base64(), &hash, &signature).is_err());
    }

    #[test]
    fn verify_rejects_tampered_hash() {
        let keypair = Keypair::generate();
        let hash = sample_hash_hex();
        let signature = keypair.sign_hash(&hash).unwrap();
        let mut other_hasher = Sha256::new();
        other_hasher.update(b"different event bytes");
        let different_hash = hex::encode(other_hasher.finalize());
        assert!(verify(&keypair.public_key_base64(), &different_hash, &signature).is_err());
    }

    #[test]
    fn seed_round_trips_through_base64() {
        let keypair = Keypair::generate();
        let seed = keypair.seed_base64();
        let restored = Keypair::from_base64_seed(&seed).unwrap();
        assert_eq!(keypair.public_key_base64(), restored.public_key_base64());
    }

    #[test]
    fn system_keypair_falls_back_to_ephemeral_when_no_path_given() {
        let system = SystemKeypair::load_or_generate(None).unwrap();
        assert!(!system.persisted);
    }
}
