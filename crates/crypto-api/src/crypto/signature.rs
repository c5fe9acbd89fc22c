//! RSA signatures over caller-supplied data: RSASSA-PKCS1-v1_5 with SHA-256.
//!
//! Keys are passed in per call as PEM text and are not retained.

use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    signature::{SignatureEncoding, Signer, Verifier},
    RsaPrivateKey, RsaPublicKey,
};
use sha2::Sha256;
use tracing::warn;

use super::CryptoError;

/// Sign `data` with a PEM-encoded RSA private key and return the signature as hex.
///
/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`).
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the key does not parse and
/// [`CryptoError::SigningFailed`] if the RSA operation fails.
pub fn sign_data(data: &str, private_key_pem: &str) -> Result<String, CryptoError> {
    let key = parse_private_key(private_key_pem)?;
    let signer = SigningKey::<Sha256>::new(key);
    let signature = signer.try_sign(data.as_bytes()).map_err(|e| {
        warn!(error = %e, "RSA signing failed");
        CryptoError::SigningFailed
    })?;
    Ok(hex::encode(signature.to_bytes()))
}

/// Check a hex signature over `data` against a PEM-encoded RSA public key.
///
/// Accepts SPKI (`BEGIN PUBLIC KEY`) and PKCS#1 (`BEGIN RSA PUBLIC KEY`).
/// A signature that does not match is `Ok(false)`, not an error.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the key does not parse and
/// [`CryptoError::InvalidSignature`] if the signature is empty or not hex.
pub fn verify_signature(
    data: &str,
    public_key_pem: &str,
    signature_hex: &str,
) -> Result<bool, CryptoError> {
    let key = parse_public_key(public_key_pem)?;

    let raw = hex::decode(signature_hex.trim()).map_err(|_| CryptoError::InvalidSignature)?;
    if raw.is_empty() {
        return Err(CryptoError::InvalidSignature);
    }
    let signature =
        Signature::try_from(raw.as_slice()).map_err(|_| CryptoError::InvalidSignature)?;

    let verifier = VerifyingKey::<Sha256>::new(key);
    Ok(verifier.verify(data.as_bytes(), &signature).is_ok())
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| {
            warn!(error = %e, "private key is not a PKCS#8 or PKCS#1 RSA key");
            CryptoError::InvalidKey
        })
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| {
            warn!(error = %e, "public key is not an SPKI or PKCS#1 RSA key");
            CryptoError::InvalidKey
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use aes_gcm::aead::OsRng;
    use rsa::{
        pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey},
        pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding},
    };
    use std::sync::OnceLock;

    /// A 2048-bit key pair, generated once per test binary.
    pub(crate) fn test_key_pair() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
    }

    /// (PKCS#8 private PEM, SPKI public PEM).
    pub(crate) fn test_pems() -> (String, String) {
        let key = test_key_pair();
        let private = key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public = key.to_public_key().to_public_key_pem(LineEnding::LF).unwrap();
        (private, public)
    }

    #[test]
    fn sign_then_verify() {
        let (private, public) = test_pems();
        let signature = sign_data("dados para assinar", &private).unwrap();
        assert_eq!(signature.len(), 256 * 2);
        assert!(verify_signature("dados para assinar", &public, &signature).unwrap());
    }

    #[test]
    fn verify_rejects_different_data() {
        let (private, public) = test_pems();
        let signature = sign_data("dados para assinar", &private).unwrap();
        assert!(!verify_signature("dados_errados", &public, &signature).unwrap());
    }

    #[test]
    fn signing_is_deterministic() {
        let (private, _) = test_pems();
        assert_eq!(
            sign_data("same", &private).unwrap(),
            sign_data("same", &private).unwrap()
        );
    }

    #[test]
    fn pkcs1_keys_accepted() {
        let key = test_key_pair();
        let private = key.to_pkcs1_pem(LineEnding::LF).unwrap().to_string();
        let public = key.to_public_key().to_pkcs1_pem(LineEnding::LF).unwrap();
        let signature = sign_data("pkcs1", &private).unwrap();
        assert!(verify_signature("pkcs1", &public, &signature).unwrap());
    }

    #[test]
    fn tampered_signature_does_not_verify() {
        let (private, public) = test_pems();
        let mut raw = hex::decode(sign_data("data", &private).unwrap()).unwrap();
        raw[10] ^= 0x01;
        assert!(!verify_signature("data", &public, &hex::encode(raw)).unwrap());
    }

    #[test]
    fn garbage_keys_are_errors() {
        assert_eq!(
            sign_data("data", "not a pem").unwrap_err(),
            CryptoError::InvalidKey
        );
        assert_eq!(
            verify_signature("data", "not a pem", "00").unwrap_err(),
            CryptoError::InvalidKey
        );
    }

    #[test]
    fn malformed_signature_is_error_not_false() {
        let (_, public) = test_pems();
        assert_eq!(
            verify_signature("data", &public, "zz-not-hex").unwrap_err(),
            CryptoError::InvalidSignature
        );
        assert_eq!(
            verify_signature("data", &public, "").unwrap_err(),
            CryptoError::InvalidSignature
        );
    }
}
