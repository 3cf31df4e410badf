//! Anonymous sealed-box encryption.
//!
//! Implements libsodium's `crypto_box_seal`: an ephemeral X25519 key pair is
//! generated per call and its public half is prepended to the ciphertext,
//! so the caller manages neither sender keys nor nonces. Only the holder of
//! the recipient's private key can open the box.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crypto_box::PublicKey;
use crypto_box::aead::OsRng;

use crate::error::{SyncError, SyncResult};

/// Length of an X25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Bytes a sealed box adds to the plaintext (ephemeral key + MAC tag).
pub const SEAL_OVERHEAD: usize = PUBLIC_KEY_LEN + 16;

/// Seals `plaintext` for the owner of `public_key`.
///
/// Sealing is randomized: sealing the same plaintext twice yields different
/// ciphertexts.
pub fn seal(public_key: &[u8], plaintext: &str) -> SyncResult<Vec<u8>> {
    let key: [u8; PUBLIC_KEY_LEN] = public_key.try_into().map_err(|_| {
        SyncError::encryption(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_LEN,
            public_key.len()
        ))
    })?;

    PublicKey::from(key)
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|e| SyncError::encryption(format!("sealing failed: {}", e)))
}

/// Decodes a base64 public key, seals `plaintext` and base64-encodes the box.
///
/// This is the text form secret vaults exchange over JSON.
pub fn seal_base64(public_key_b64: &str, plaintext: &str) -> SyncResult<String> {
    let key = STANDARD
        .decode(public_key_b64.trim())
        .map_err(|e| SyncError::encryption(format!("public key is not valid base64: {}", e)))?;
    Ok(STANDARD.encode(seal(&key, plaintext)?))
}
