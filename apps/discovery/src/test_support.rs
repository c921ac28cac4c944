//! Test-only helpers that keep production modules lean.
//!
//! Signing here mirrors what clients do: keccak256 over the raw body, a
//! recoverable secp256k1 signature serialized as `r || s || v`, base64 in the
//! `Authorization` header.

use std::sync::Arc;

use actix_web::web;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use crate::identity::{Identity, IdentityVerifier, Secp256k1Recovery};

/// Address of the key built from `signing_key(1)` (`0x01` repeated 32 times).
pub const STATIC_ADDRESS: &str = "0x1a642f0e3c3af545e7acbd38b07251b3990914f1";

/// Deterministic private key with every byte set to `seed`.
///
/// `seed` must be non-zero.
pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).expect("seed must be a valid secp256k1 scalar")
}

pub fn identity_of(key: &SigningKey) -> Identity {
    Identity::from_verifying_key(key.verifying_key())
}

/// 65-byte recoverable signature over `message`.
pub fn sign_message(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    let prehash = Keccak256::digest(message);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(prehash.as_slice())
        .expect("signing a 32-byte prehash cannot fail");

    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte());
    bytes
}

/// `Authorization` header value for `body` signed by `key`.
pub fn authorization_header(key: &SigningKey, body: &[u8]) -> String {
    format!("Signature {}", BASE64.encode(sign_message(key, body)))
}

/// Secp256k1 recovery as app data, the way the binary registers it.
pub fn verifier_data() -> web::Data<dyn IdentityVerifier> {
    web::Data::from(Arc::new(Secp256k1Recovery) as Arc<dyn IdentityVerifier>)
}
