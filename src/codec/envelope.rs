use crate::error::CodecError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Length of the AES-GCM nonce prefixed to every encrypted envelope.
pub const NONCE_LEN: usize = 12;

/// The envelope key is derived from this many consecutive byte values.
///
/// The player bundle hardcodes the same salt, so this is obfuscation rather
/// than confidentiality; the exact bytes must match to interoperate.
const SALT_LEN: usize = 31;

fn envelope_key() -> [u8; 32] {
    let salt: [u8; SALT_LEN] = std::array::from_fn(|i| i as u8);
    Sha256::digest(salt).into()
}

/// Recovers the plaintext bytes of an encrypted work export.
///
/// The export format applies, in order: AES-256-GCM encryption (12-byte
/// nonce prefix, 128-bit tag appended to the ciphertext), Base64 encoding,
/// and a character-order reversal. This function undoes all three.
///
/// A tag mismatch yields [`CodecError::Authentication`] and must not be
/// retried; the envelope is either damaged or foreign.
pub fn decrypt(obfuscated: &str) -> Result<Vec<u8>, CodecError> {
    let unreversed: String = obfuscated.chars().rev().collect();
    let envelope = STANDARD.decode(unreversed)?;
    if envelope.len() <= NONCE_LEN {
        return Err(CodecError::Format {
            len: envelope.len(),
        });
    }

    let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
    debug!(
        ciphertext_len = ciphertext.len(),
        "unpacking encrypted envelope"
    );

    let key = envelope_key();
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CodecError::Authentication)
}
