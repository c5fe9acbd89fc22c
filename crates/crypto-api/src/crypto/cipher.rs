//! AES-256-GCM token encryption with a per-token scrypt-derived key.
//!
//! Each call to [`CipherEngine::encrypt`] draws a fresh salt and IV from the
//! OS CSPRNG, so every token is encrypted under its own key. No associated
//! data is bound; the salt is authenticated indirectly because a changed salt
//! derives a different key and the tag check fails.

use std::{fmt, str::FromStr, sync::Arc};

use aes_gcm::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Nonce, Tag,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use super::kdf::{derive_key, KdfError};
use super::{CryptoError, Secret};

/// Byte length of the GCM IV (12 bytes = 96 bits).
pub const IV_LEN: usize = 12;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Byte length of the per-token key-derivation salt.
pub const SALT_LEN: usize = 32;

/// Internal failure causes. Logged, never returned to callers.
#[derive(Debug, Error)]
enum CipherFailure {
    #[error(transparent)]
    Kdf(#[from] KdfError),

    #[error("OS random generator unavailable: {0}")]
    Rng(String),

    #[error("aead operation failed")]
    Aead,

    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

/// A parsed token.
///
/// The string representation is `<iv>:<ciphertext>:<tag>.<salt>`, every field
/// lowercase hex. The salt is kept as the hex text it travels as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
    pub salt: String,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}.{}",
            hex::encode(self.iv),
            hex::encode(&self.ciphertext),
            hex::encode(self.tag),
            self.salt,
        )
    }
}

impl FromStr for Token {
    type Err = CryptoError;

    /// Parse a token without doing any cryptographic work.
    ///
    /// The salt follows the last `.`; the rest must be exactly three
    /// `:`-separated hex fields with a 12-byte IV and a 16-byte tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (body, salt) = s.rsplit_once('.').ok_or(CryptoError::InvalidTokenFormat)?;

        let parts: Vec<&str> = body.split(':').collect();
        let &[iv, ciphertext, tag] = parts.as_slice() else {
            return Err(CryptoError::InvalidTokenFormat);
        };

        decode_fixed::<SALT_LEN>(salt)?;

        Ok(Self {
            iv: decode_fixed(iv)?,
            ciphertext: hex::decode(ciphertext).map_err(|_| CryptoError::InvalidTokenFormat)?,
            tag: decode_fixed(tag)?,
            salt: salt.to_owned(),
        })
    }
}

fn decode_fixed<const N: usize>(field: &str) -> Result<[u8; N], CryptoError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(field, &mut out).map_err(|_| CryptoError::InvalidTokenFormat)?;
    Ok(out)
}

/// Encrypts payloads into tokens and back.
///
/// Holds only the shared, immutable [`Secret`]; clones are cheap and every
/// call is independent, so one engine can serve any number of concurrent
/// requests.
#[derive(Clone, Debug)]
pub struct CipherEngine {
    secret: Arc<Secret>,
}

impl CipherEngine {
    pub fn new(secret: Secret) -> Self {
        Self {
            secret: Arc::new(secret),
        }
    }

    /// Encrypt UTF-8 text into a token.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if randomness, key derivation
    /// or the cipher fails. The cause is logged server-side only.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        self.seal(plaintext.as_bytes())
            .map(|token| token.to_string())
            .map_err(|e| {
                error!(error = %e, "AES-256-GCM encryption failed");
                CryptoError::EncryptionFailed
            })
    }

    /// Encrypt a JSON payload: strings verbatim, anything else as JSON text.
    pub fn encrypt_payload(&self, payload: &serde_json::Value) -> Result<String, CryptoError> {
        match payload {
            serde_json::Value::String(text) => self.encrypt(text),
            other => self.encrypt_object(other),
        }
    }

    /// Serialise `value` to JSON and encrypt the resulting text.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NotSerializable`] if `value` cannot be written as
    /// JSON (e.g. a map with non-string keys), before any crypto work happens.
    pub fn encrypt_object<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CryptoError> {
        let text = serde_json::to_string(value).map_err(|e| {
            warn!(error = %e, "payload could not be serialised for encryption");
            CryptoError::NotSerializable
        })?;
        self.encrypt(&text)
    }

    /// Decrypt a token back to the exact text it was created from.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidTokenFormat`] for a malformed token and
    /// [`CryptoError::DecryptionFailed`] for every cryptographic failure.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let token: Token = token.parse()?;
        self.open(&token).map_err(|e| {
            warn!(error = %e, "AES-256-GCM decryption failed");
            CryptoError::DecryptionFailed
        })
    }

    /// Decrypt a token and parse its text as JSON into `T`.
    ///
    /// # Errors
    ///
    /// As [`CipherEngine::decrypt`], plus [`CryptoError::InvalidJson`] if the
    /// plaintext does not parse as `T`.
    pub fn decrypt_to_object<T: DeserializeOwned>(&self, token: &str) -> Result<T, CryptoError> {
        let text = self.decrypt(token)?;
        serde_json::from_str(&text).map_err(|e| {
            // Only the position is logged; serde's message can quote plaintext.
            warn!(line = e.line(), column = e.column(), "decrypted data is not valid JSON");
            CryptoError::InvalidJson
        })
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Token, CipherFailure> {
        let mut iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CipherFailure::Rng(e.to_string()))?;

        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| CipherFailure::Rng(e.to_string()))?;
        let salt = hex::encode(salt);

        let key = derive_key(&self.secret, salt.as_str())?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CipherFailure::Aead)?;

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| CipherFailure::Aead)?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);

        Ok(Token {
            iv,
            ciphertext: buffer,
            tag: tag_bytes,
            salt,
        })
    }

    fn open(&self, token: &Token) -> Result<String, CipherFailure> {
        let key = derive_key(&self.secret, token.salt.as_str())?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CipherFailure::Aead)?;

        let mut buffer = token.ciphertext.clone();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&token.iv),
                b"",
                &mut buffer,
                Tag::from_slice(&token.tag),
            )
            .map_err(|_| CipherFailure::Aead)?;

        String::from_utf8(buffer).map_err(|_| CipherFailure::Utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    const TEST_SECRET: &str = "12345678901234567890123456789012";

    fn engine() -> CipherEngine {
        CipherEngine::new(Secret::new(TEST_SECRET).unwrap())
    }

    /// Replace the hex digit at `idx` with a different hex digit.
    fn flip_hex_char(token: &str, idx: usize) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        chars[idx] = if chars[idx] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let engine = engine();
        let token = engine.encrypt("Mensagem secreta!").unwrap();
        assert_eq!(engine.decrypt(&token).unwrap(), "Mensagem secreta!");
    }

    #[test]
    fn round_trip_unicode_and_empty() {
        let engine = engine();
        for text in ["", "olá, mundo 🌍", "a:b:c.d", "line\nbreak"] {
            let token = engine.encrypt(text).unwrap();
            assert_eq!(engine.decrypt(&token).unwrap(), text);
        }
    }

    #[test]
    fn token_has_expected_shape() {
        let token = engine().encrypt("hello").unwrap();
        let (body, salt) = token.rsplit_once('.').unwrap();
        let parts: Vec<&str> = body.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), IV_LEN * 2);
        assert_eq!(parts[1].len(), "hello".len() * 2);
        assert_eq!(parts[2].len(), TAG_LEN * 2);
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.'));
    }

    #[test]
    fn same_plaintext_yields_different_tokens() {
        let engine = engine();
        let t1 = engine.encrypt("same").unwrap();
        let t2 = engine.encrypt("same").unwrap();
        assert_ne!(t1, t2);
        let p1: Token = t1.parse().unwrap();
        let p2: Token = t2.parse().unwrap();
        assert_ne!(p1.iv, p2.iv);
        assert_ne!(p1.salt, p2.salt);
    }

    #[test]
    fn tampering_any_segment_fails_authentication() {
        let engine = engine();
        let token = engine.encrypt("tamper me").unwrap();
        let iv_idx = 0;
        let ct_idx = IV_LEN * 2 + 1;
        let tag_idx = IV_LEN * 2 + 1 + "tamper me".len() * 2 + 1;
        let salt_idx = token.len() - 1;

        for idx in [iv_idx, ct_idx, tag_idx, salt_idx] {
            let tampered = flip_hex_char(&token, idx);
            assert_ne!(tampered, token);
            assert_eq!(
                engine.decrypt(&tampered).unwrap_err(),
                CryptoError::DecryptionFailed,
                "tampering at index {idx} was not detected"
            );
        }
    }

    #[test]
    fn wrong_secret_fails_decryption() {
        let token = engine().encrypt("secret").unwrap();
        let other = CipherEngine::new(Secret::new("abcdefghijklmnopqrstuvwxyzABCDEF").unwrap());
        assert_eq!(
            other.decrypt(&token).unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn malformed_tokens_rejected_before_crypto() {
        let engine = engine();
        for bad in [
            "string_invalida",
            "",
            "abc.def",
            "a:b.c",
            "a:b:c:d.e",
            "00:00:00",
            "zz:00:00.00",
        ] {
            assert_eq!(
                engine.decrypt(bad).unwrap_err(),
                CryptoError::InvalidTokenFormat,
                "expected format error for {bad:?}"
            );
        }
    }

    #[test]
    fn wrong_field_lengths_are_format_errors() {
        let token = engine().encrypt("x").unwrap();
        let parsed: Token = token.parse().unwrap();

        let short_iv = format!(
            "{}:{}:{}.{}",
            hex::encode(&parsed.iv[..8]),
            hex::encode(&parsed.ciphertext),
            hex::encode(parsed.tag),
            parsed.salt
        );
        assert_eq!(
            short_iv.parse::<Token>().unwrap_err(),
            CryptoError::InvalidTokenFormat
        );

        let short_salt = format!("{}.abcd", token.rsplit_once('.').unwrap().0);
        assert_eq!(
            short_salt.parse::<Token>().unwrap_err(),
            CryptoError::InvalidTokenFormat
        );
    }

    #[test]
    fn token_display_parse_round_trip() {
        let token = engine().encrypt("round").unwrap();
        let parsed: Token = token.parse().unwrap();
        assert_eq!(parsed.to_string(), token);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        user: String,
        roles: Vec<String>,
    }

    #[test]
    fn object_round_trip() {
        let engine = engine();
        let obj = User {
            user: "john".into(),
            roles: vec!["admin".into(), "user".into()],
        };
        let token = engine.encrypt_object(&obj).unwrap();
        let back: User = engine.decrypt_to_object(&token).unwrap();
        assert_eq!(back, obj);
    }

    #[test]
    fn payload_strings_are_not_json_quoted() {
        let engine = engine();
        let token = engine.encrypt_payload(&json!("plain text")).unwrap();
        assert_eq!(engine.decrypt(&token).unwrap(), "plain text");

        let token = engine.encrypt_payload(&json!({"a": 1})).unwrap();
        assert_eq!(engine.decrypt(&token).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn decrypt_to_object_rejects_non_json_plaintext() {
        let engine = engine();
        let token = engine.encrypt("not json at all").unwrap();
        assert_eq!(
            engine.decrypt_to_object::<serde_json::Value>(&token).unwrap_err(),
            CryptoError::InvalidJson
        );
    }

    #[test]
    fn concurrent_encryptions_use_fresh_iv_and_salt() {
        let engine = engine();
        let tokens: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| engine.encrypt("same text").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let parsed: Vec<Token> = tokens.iter().map(|t| t.parse().unwrap()).collect();
        let ivs: HashSet<_> = parsed.iter().map(|t| t.iv).collect();
        let salts: HashSet<_> = parsed.iter().map(|t| t.salt.clone()).collect();
        assert_eq!(ivs.len(), tokens.len());
        assert_eq!(salts.len(), tokens.len());

        for token in &tokens {
            assert_eq!(engine.decrypt(token).unwrap(), "same text");
        }
    }

    #[test]
    fn unserialisable_payload_is_distinct_error() {
        let mut map: HashMap<(u8, u8), u8> = HashMap::new();
        map.insert((1, 2), 3);
        assert_eq!(
            engine().encrypt_object(&map).unwrap_err(),
            CryptoError::NotSerializable
        );
    }

    #[test]
    fn engine_debug_does_not_leak_secret() {
        let dbg = format!("{:?}", engine());
        assert!(!dbg.contains(TEST_SECRET));
    }
}
