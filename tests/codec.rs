//! Tests for the encrypted envelope codec.
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fukugen::codec;
use fukugen::error::CodecError;
use sha2::{Digest, Sha256};

/// Builds an envelope the way the platform's exporter does: AES-256-GCM
/// under the published salt-derived key, nonce prefixed, Base64, reversed.
fn encrypt_envelope(plaintext: &[u8], nonce_bytes: [u8; 12]) -> String {
    let key: [u8; 32] = Sha256::digest((0u8..31).collect::<Vec<u8>>()).into();
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .expect("encryption cannot fail for valid inputs");

    let mut envelope = nonce_bytes.to_vec();
    envelope.extend(ciphertext);
    STANDARD.encode(envelope).chars().rev().collect()
}

#[test]
fn test_roundtrip_recovers_plaintext_exactly() {
    let plaintext = r#"{"theatre": {"actors": {}}, "note": "你好"}"#.as_bytes();
    let obfuscated = encrypt_envelope(plaintext, [7u8; 12]);

    let recovered = codec::decrypt(&obfuscated).expect("decryption should succeed");
    assert_eq!(recovered, plaintext);
}

#[test]
fn test_tampered_ciphertext_fails_authentication() {
    let obfuscated = encrypt_envelope(b"{\"a\": 1}", [3u8; 12]);

    // Undo the outer obfuscation, flip one ciphertext byte, re-wrap.
    let unreversed: String = obfuscated.chars().rev().collect();
    let mut envelope = STANDARD.decode(unreversed).expect("valid base64");
    let last = envelope.len() - 1;
    envelope[last] ^= 0x01;
    let tampered: String = STANDARD.encode(envelope).chars().rev().collect();

    assert!(matches!(
        codec::decrypt(&tampered),
        Err(CodecError::Authentication)
    ));
}

#[test]
fn test_tampered_nonce_fails_authentication() {
    let obfuscated = encrypt_envelope(b"{\"a\": 1}", [3u8; 12]);

    let unreversed: String = obfuscated.chars().rev().collect();
    let mut envelope = STANDARD.decode(unreversed).expect("valid base64");
    envelope[0] ^= 0xff;
    let tampered: String = STANDARD.encode(envelope).chars().rev().collect();

    assert!(matches!(
        codec::decrypt(&tampered),
        Err(CodecError::Authentication)
    ));
}

#[test]
fn test_invalid_base64_is_a_decode_error() {
    assert!(matches!(
        codec::decrypt("!!definitely not base64!!"),
        Err(CodecError::Decode(_))
    ));
}

#[test]
fn test_envelope_shorter_than_nonce_plus_tag_is_a_format_error() {
    // Twelve bytes is exactly a nonce with no ciphertext at all.
    let short: String = STANDARD.encode([0u8; 12]).chars().rev().collect();
    match codec::decrypt(&short) {
        Err(CodecError::Format { len }) => assert_eq!(len, 12),
        other => panic!("expected a format error, got {other:?}"),
    }
}
