//! AES-CFB encryption of stored secrets.
//!
//! **Algorithm choice:** AES in full-block CFB mode, keyed by a pre-shared
//! secret of 16, 24 or 32 bytes (AES-128/192/256) with a fixed 16-byte IV.
//! CFB turns the block cipher into a stream cipher, so secrets of any length
//! are encrypted without padding.
//!
//! **Security caveat:** the IV is fixed, so identical plaintext under the same
//! key always yields identical ciphertext, and there is no authentication tag.
//! Existing stored data depends on this format.

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Byte length of the CFB initialisation vector (one AES block).
pub const IV_LEN: usize = 16;

/// Accepted key lengths in bytes, selecting AES-128, AES-192 and AES-256.
pub const KEY_LENS: [usize; 3] = [16, 24, 32];

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;
type Aes192CfbEnc = cfb_mode::Encryptor<Aes192>;
type Aes192CfbDec = cfb_mode::Decryptor<Aes192>;
type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Encryption failed; only malformed key material can cause this.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Decryption failed: bad base64, malformed key material, or ciphertext
    /// that does not decrypt to UTF-8.
    #[error("decode failed: {0}")]
    Decode(String),
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Key material buffer, zeroed on drop.
#[derive(Clone)]
struct KeyBytes(Vec<u8>);

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Encrypts secrets before they are stored and decrypts them on redemption.
///
/// Key and IV are taken as-is at construction; malformed lengths surface as
/// [`CipherError`] from [`encode`](Self::encode) / [`decode`](Self::decode),
/// and can be checked up front with [`check`](Self::check).
#[derive(Clone)]
pub struct SymmetricEncoder {
    key: KeyBytes,
    iv: Vec<u8>,
}

impl std::fmt::Debug for SymmetricEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricEncoder")
            .field("key", &"[REDACTED]")
            .field("key_len", &self.key.0.len())
            .finish()
    }
}

impl SymmetricEncoder {
    /// Create an encoder over the given key and IV bytes.
    pub fn new(key: impl Into<Vec<u8>>, iv: impl Into<Vec<u8>>) -> Self {
        Self {
            key: KeyBytes(key.into()),
            iv: iv.into(),
        }
    }

    /// Verify that the key and IV have lengths AES-CFB accepts.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid length found.
    pub fn check(&self) -> Result<(), String> {
        check_lengths(&self.key.0, &self.iv)
    }

    /// Encrypt `plaintext` and return the ciphertext as standard padded base64.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encode`] if the key or IV length is invalid.
    pub fn encode(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut buf = plaintext.as_bytes().to_vec();
        apply_keystream(&self.key.0, &self.iv, &mut buf, Direction::Encrypt)
            .map_err(CipherError::Encode)?;
        Ok(STANDARD.encode(buf))
    }

    /// Decrypt a base64 ciphertext produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decode`] if the input is not valid base64, the
    /// key or IV length is invalid, or the decrypted bytes are not UTF-8.
    pub fn decode(&self, ciphertext: &str) -> Result<String, CipherError> {
        let mut buf = STANDARD
            .decode(ciphertext)
            .map_err(|e| CipherError::Decode(format!("invalid base64: {e}")))?;
        apply_keystream(&self.key.0, &self.iv, &mut buf, Direction::Decrypt)
            .map_err(CipherError::Decode)?;
        String::from_utf8(buf)
            .map_err(|_| CipherError::Decode("plaintext is not valid UTF-8".into()))
    }
}

fn check_lengths(key: &[u8], iv: &[u8]) -> Result<(), String> {
    if !KEY_LENS.contains(&key.len()) {
        return Err(format!(
            "invalid key length {}: expected 16, 24 or 32 bytes",
            key.len()
        ));
    }
    if iv.len() != IV_LEN {
        return Err(format!(
            "invalid IV length {}: expected {IV_LEN} bytes",
            iv.len()
        ));
    }
    Ok(())
}

/// XOR the CFB keystream for `key`/`iv` into `buf` in place.
fn apply_keystream(
    key: &[u8],
    iv: &[u8],
    buf: &mut [u8],
    direction: Direction,
) -> Result<(), String> {
    check_lengths(key, iv)?;
    let invalid = |_| "cipher rejected key material".to_owned();
    match (key.len(), direction) {
        (16, Direction::Encrypt) => Aes128CfbEnc::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt(buf),
        (16, Direction::Decrypt) => Aes128CfbDec::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        (24, Direction::Encrypt) => Aes192CfbEnc::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt(buf),
        (24, Direction::Decrypt) => Aes192CfbDec::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        (32, Direction::Encrypt) => Aes256CfbEnc::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt(buf),
        (32, Direction::Decrypt) => Aes256CfbDec::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        _ => return Err(format!("invalid key length {}", key.len())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_24: &[u8] = b"123456789123456789012345";
    const IV: [u8; IV_LEN] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

    fn encoder() -> SymmetricEncoder {
        SymmetricEncoder::new(KEY_24, IV)
    }

    #[test]
    fn encode_decode_round_trip() {
        let enc = encoder();
        for text in ["initial text", "", "hunter2", "пароль 🔑 密码", "a\0b\nc"] {
            let encoded = enc.encode(text).unwrap();
            assert_eq!(enc.decode(&encoded).unwrap(), text);
        }
    }

    #[test]
    fn round_trip_for_every_key_size() {
        for len in KEY_LENS {
            let enc = SymmetricEncoder::new(vec![0x42u8; len], IV);
            let encoded = enc.encode("secret").unwrap();
            assert_eq!(enc.decode(&encoded).unwrap(), "secret");
        }
    }

    #[test]
    fn ciphertext_is_deterministic_and_length_preserving() {
        let enc = encoder();
        let a = enc.encode("same input").unwrap();
        let b = enc.encode("same input").unwrap();
        assert_eq!(a, b);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), "same input".len());
        assert_ne!(a, STANDARD.encode("same input"));
    }

    #[test]
    fn empty_plaintext_encodes_to_empty_string() {
        assert_eq!(encoder().encode("").unwrap(), "");
    }

    #[test]
    fn aes128_cfb_known_answer() {
        // NIST SP 800-38A, F.3.13 CFB128-AES128.Encrypt, first segment.
        let key = [
            0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf,
            0x4f, 0x3c,
        ];
        let iv: Vec<u8> = (0u8..16).collect();
        let mut block = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a,
        ];
        apply_keystream(&key, &iv, &mut block, Direction::Encrypt).unwrap();
        assert_eq!(
            block,
            [
                0x3b, 0x3f, 0xd9, 0x2e, 0xb7, 0x2d, 0xad, 0x20, 0x33, 0x34, 0x49, 0xf8, 0xe8, 0x3c,
                0xfb, 0x4a
            ]
        );
    }

    #[test]
    fn invalid_key_length_fails_encode() {
        let enc = SymmetricEncoder::new(b"short".to_vec(), IV);
        assert!(matches!(enc.encode("x"), Err(CipherError::Encode(_))));
        assert!(enc.check().is_err());
    }

    #[test]
    fn invalid_iv_length_fails_both_directions() {
        let enc = SymmetricEncoder::new(KEY_24, vec![0u8; 8]);
        assert!(matches!(enc.encode("x"), Err(CipherError::Encode(_))));
        assert!(matches!(enc.decode("AAAA"), Err(CipherError::Decode(_))));
    }

    #[test]
    fn malformed_base64_fails_decode() {
        assert!(matches!(
            encoder().decode("not base64!!"),
            Err(CipherError::Decode(_))
        ));
    }

    #[test]
    fn wrong_key_does_not_recover_plaintext() {
        let encoded = encoder().encode("top secret value").unwrap();
        let other = SymmetricEncoder::new(b"abcdefghijklmnopqrstuvwx".to_vec(), IV);
        assert_ne!(other.decode(&encoded).ok().as_deref(), Some("top secret value"));
    }

    #[test]
    fn debug_redacts_key() {
        let rendered = format!("{:?}", encoder());
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("123456789"));
    }
}
