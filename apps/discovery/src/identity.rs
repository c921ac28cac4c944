//! Caller identity recovery from recoverable secp256k1 signatures.
//!
//! Clients never send a public key or token. They sign the raw request body
//! and the service recovers the account address that produced the signature:
//!
//! ```text
//! prehash   = keccak256(body)
//! pubkey    = ecrecover(prehash, r, s, v)
//! identity  = "0x" + hex(keccak256(pubkey_uncompressed[1..])[12..])
//! ```
//!
//! The message is hashed exactly as received. Re-encoding the body (for
//! example parsing and re-serializing JSON) before recovery yields a different
//! address.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Length of a serialized recoverable signature: `r || s || v`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset used by legacy Ethereum tooling for the recovery byte.
const LEGACY_RECOVERY_OFFSET: u8 = 27;

/// Reasons a signature cannot be turned into an identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature must be {SIGNATURE_LENGTH} bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("invalid signature scalars: {0}")]
    InvalidScalars(String),

    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Canonical account identifier: lower-case, `0x`-prefixed, 20-byte hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Derive the account identifier from a secp256k1 public key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // Skip the 0x04 SEC1 tag; the address hashes only the x||y coordinates.
        let digest = Keccak256::digest(&point.as_bytes()[1..]);
        Self(format!("0x{}", hex::encode(&digest[12..])))
    }

    /// Case-insensitive comparison against a caller-declared identifier.
    pub fn matches(&self, declared: &str) -> bool {
        self.0.eq_ignore_ascii_case(declared)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Recovers the identity that signed a message.
///
/// Implementations must be pure: the same `(message, signature)` pair always
/// yields the same result and no I/O is performed.
pub trait IdentityVerifier: Send + Sync {
    fn recover(&self, message: &[u8], signature: &[u8]) -> Result<Identity, SignatureError>;
}

/// Ethereum-style recovery: secp256k1 over an unprefixed keccak256 prehash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Recovery;

impl Secp256k1Recovery {
    fn split(signature: &[u8]) -> Result<(Signature, RecoveryId), SignatureError> {
        if signature.len() != SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidLength(signature.len()));
        }
        let (scalars, v) = signature.split_at(SIGNATURE_LENGTH - 1);

        let v = v[0];
        let normalized = if v >= LEGACY_RECOVERY_OFFSET {
            v - LEGACY_RECOVERY_OFFSET
        } else {
            v
        };
        // Only the y-parity bit is meaningful; x-overflow ids are never produced by signers.
        let recovery_id = match normalized {
            0 | 1 => RecoveryId::from_byte(normalized),
            _ => None,
        }
        .ok_or(SignatureError::InvalidRecoveryId(v))?;

        let signature = Signature::from_slice(scalars)
            .map_err(|e| SignatureError::InvalidScalars(e.to_string()))?;

        // Recovery only accepts low-S. Negating s mirrors R, so the y parity flips.
        match signature.normalize_s() {
            Some(low_s) => Ok((
                low_s,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            )),
            None => Ok((signature, recovery_id)),
        }
    }
}

impl IdentityVerifier for Secp256k1Recovery {
    fn recover(&self, message: &[u8], signature: &[u8]) -> Result<Identity, SignatureError> {
        let (signature, recovery_id) = Self::split(signature)?;
        let prehash = Keccak256::digest(message);

        let key = VerifyingKey::recover_from_prehash(prehash.as_slice(), &signature, recovery_id)
            .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))?;

        Ok(Identity::from_verifying_key(&key))
    }
}
