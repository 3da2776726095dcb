//! BIP-340 Schnorr signing over secp256k1.

use super::SignError;
use crate::models::{Event, UnsignedEvent};
use secp256k1::{Keypair, Message, Secp256k1, SecretKey};
use tracing::warn;

/// Parse a 32-byte hex secret key
pub fn secret_key_from_hex(secret_hex: &str) -> Result<SecretKey, SignError> {
    let bytes = hex::decode(secret_hex.trim())
        .map_err(|e| SignError::Credential(format!("private key is not hex: {e}")))?;
    SecretKey::from_slice(&bytes)
        .map_err(|e| SignError::Credential(format!("invalid private key: {e}")))
}

/// Hex x-only public key for a secret key
pub fn public_key_hex(secret_key: &SecretKey) -> String {
    let secp = Secp256k1::new();
    let keypair = Keypair::from_secret_key(&secp, secret_key);
    hex::encode(keypair.x_only_public_key().0.serialize())
}

/// Compute the id and a deterministic signature with `secret_key`.
///
/// The returned event's `pubkey` is the key's own public key; the id commits to
/// it, so an event prepared for another key is re-addressed to the signer.
pub fn sign_event(event: &UnsignedEvent, secret_key: &SecretKey) -> Result<Event, SignError> {
    let secp = Secp256k1::new();
    let keypair = Keypair::from_secret_key(&secp, secret_key);
    let pubkey = hex::encode(keypair.x_only_public_key().0.serialize());

    let mut unsigned = event.clone();
    if unsigned.pubkey != pubkey {
        warn!(
            expected = %unsigned.pubkey,
            signer = %pubkey,
            "Event pubkey differs from signing key; using signer pubkey"
        );
        unsigned.pubkey = pubkey;
    }

    let hash = unsigned
        .hash()
        .map_err(|e| SignError::Internal(e.to_string()))?;
    let msg = Message::from_digest_slice(&hash).map_err(|e| SignError::Internal(e.to_string()))?;
    let sig = secp.sign_schnorr_no_aux_rand(&msg, &keypair);

    Ok(unsigned.into_signed(hex::encode(hash), sig.to_string()))
}
