//! ed25519 signing and signature verification.
//!
//! Outgoing events are signed over their canonical bytes and carry a public
//! key envelope `{"algorithm": "ED25519", "key": "<SPKI PEM>"}`, itself
//! canonicalized and sent as a JSON string. Returned envelopes may carry that
//! envelope, a bare PEM block, or a bare base64 key.

use std::collections::BTreeMap;
use std::path::Path;

use audit_canonical::canonicalize;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::KeyError;
use crate::verification::Verification;

/// Algorithm name used in public key envelopes.
pub const ED25519: &str = "ED25519";

const PUBLIC_KEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

/// Signs canonical event bytes on behalf of a session.
pub trait Signer: Send + Sync {
    /// Algorithm name placed in the public key envelope.
    fn algorithm(&self) -> &str;

    /// Public key as published in the envelope (SPKI PEM for ed25519).
    fn public_key(&self) -> &str;

    /// Raw signature over `message`.
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// Base64 signature over `message`, as sent on the wire.
    fn sign_base64(&self, message: &[u8]) -> String {
        STANDARD.encode(self.sign(message))
    }
}

/// ed25519 signer backed by an in-memory key.
pub struct Ed25519Signer {
    signing_key: SigningKey,
    public_key_pem: String,
}

impl Ed25519Signer {
    /// Creates a signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; 32] = seed.try_into().map_err(|_| KeyError::InvalidLength {
            what: "ed25519 seed",
            expected: 32,
            actual: seed.len(),
        })?;
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    /// Creates a signer from a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyError> {
        let signing_key =
            SigningKey::from_pkcs8_pem(pem).map_err(|e| KeyError::InvalidPem(e.to_string()))?;
        Self::from_signing_key(signing_key)
    }

    /// Reads a PKCS#8 PEM private key from disk.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pkcs8_pem(&pem)
    }

    fn from_signing_key(signing_key: SigningKey) -> Result<Self, KeyError> {
        let public_key_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::InvalidPem(e.to_string()))?;
        Ok(Self {
            signing_key,
            public_key_pem,
        })
    }

    /// Verifying half of the key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn public_key(&self) -> &str {
        &self.public_key_pem
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_pem)
            .finish_non_exhaustive()
    }
}

/// Structured public key field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEnvelope {
    /// Key material: PEM block or base64.
    pub key: String,
    /// Algorithm name, when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// Builds the `public_key` request field for `signer`.
///
/// Extra `info` entries are included alongside `algorithm` and `key`; the
/// signer's values win on conflict. The result is the canonical JSON text,
/// sent as a string rather than a nested object.
pub fn public_key_envelope(
    signer: &dyn Signer,
    info: &BTreeMap<String, String>,
) -> Result<String, KeyError> {
    let mut fields = info.clone();
    fields.insert("algorithm".to_string(), signer.algorithm().to_string());
    fields.insert("key".to_string(), signer.public_key().to_string());

    let bytes = canonicalize(&fields).map_err(|e| KeyError::InvalidEnvelope(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| KeyError::InvalidEnvelope(e.to_string()))
}

/// Verifies a base64 signature over `message`.
///
/// Both fields absent is `NotVerified`; exactly one absent, any decoding
/// problem, or a bad signature is `Failed`.
pub fn verify_signature(
    message: &[u8],
    signature: Option<&str>,
    public_key: Option<&str>,
) -> Verification {
    match (signature, public_key) {
        (None, None) => Verification::NotVerified,
        (Some(signature), Some(public_key)) => match check(message, signature, public_key) {
            Ok(valid) => Verification::from_outcome(valid),
            Err(err) => {
                debug!(error = %err, "signature material rejected");
                Verification::Failed
            }
        },
        _ => Verification::Failed,
    }
}

fn check(message: &[u8], signature: &str, public_key: &str) -> Result<bool, KeyError> {
    let key = decode_public_key(public_key)?;

    let raw = STANDARD.decode(signature)?;
    let raw: [u8; SIGNATURE_LEN] = raw.as_slice().try_into().map_err(|_| KeyError::InvalidLength {
        what: "ed25519 signature",
        expected: SIGNATURE_LEN,
        actual: raw.len(),
    })?;

    Ok(key.verify(message, &Signature::from_bytes(&raw)).is_ok())
}

/// Decodes a public key field in any accepted shape.
pub fn decode_public_key(field: &str) -> Result<VerifyingKey, KeyError> {
    let trimmed = field.trim();
    if trimmed.starts_with('{') {
        let envelope: PublicKeyEnvelope = serde_json::from_str(trimmed)
            .map_err(|e| KeyError::InvalidEnvelope(e.to_string()))?;
        if let Some(algorithm) = &envelope.algorithm {
            if !algorithm.eq_ignore_ascii_case(ED25519) {
                return Err(KeyError::UnsupportedAlgorithm(algorithm.clone()));
            }
        }
        return decode_key_material(envelope.key.trim());
    }
    decode_key_material(trimmed)
}

fn decode_key_material(key: &str) -> Result<VerifyingKey, KeyError> {
    if key.starts_with("-----") {
        return VerifyingKey::from_public_key_pem(key).map_err(|e| KeyError::InvalidPem(e.to_string()));
    }

    let raw = STANDARD.decode(key)?;
    let raw: [u8; PUBLIC_KEY_LEN] = raw.as_slice().try_into().map_err(|_| KeyError::InvalidLength {
        what: "ed25519 public key",
        expected: PUBLIC_KEY_LEN,
        actual: raw.len(),
    })?;
    VerifyingKey::from_bytes(&raw).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> Ed25519Signer {
        Ed25519Signer::from_seed(&[7u8; 32]).unwrap()
    }

    #[test]
    fn pem_and_base64_keys_both_verify() {
        let signer = signer();
        let message = br#"{"message":"hello"}"#;
        let signature = signer.sign_base64(message);

        let pem = signer.public_key().to_string();
        let bare = STANDARD.encode(signer.verifying_key().to_bytes());

        assert_eq!(
            verify_signature(message, Some(&signature), Some(&pem)),
            Verification::Success
        );
        assert_eq!(
            verify_signature(message, Some(&signature), Some(&bare)),
            Verification::Success
        );
    }

    #[test]
    fn envelope_key_verifies() {
        let signer = signer();
        let message = b"payload";
        let signature = signer.sign_base64(message);
        let envelope = public_key_envelope(&signer, &BTreeMap::new()).unwrap();

        assert!(envelope.starts_with(r#"{"algorithm":"ED25519","key":"-----BEGIN PUBLIC KEY-----"#));
        assert_eq!(
            verify_signature(message, Some(&signature), Some(&envelope)),
            Verification::Success
        );
    }

    #[test]
    fn envelope_keeps_extra_info() {
        let mut info = BTreeMap::new();
        info.insert("key_id".to_string(), "k1".to_string());
        info.insert("algorithm".to_string(), "overridden".to_string());

        let envelope = public_key_envelope(&signer(), &info).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&envelope).unwrap();
        assert_eq!(parsed["key_id"], "k1");
        assert_eq!(parsed["algorithm"], ED25519);
    }

    #[test]
    fn missing_half_fails() {
        let signer = signer();
        let signature = signer.sign_base64(b"m");
        assert_eq!(verify_signature(b"m", Some(&signature), None), Verification::Failed);
        assert_eq!(
            verify_signature(b"m", None, Some(signer.public_key())),
            Verification::Failed
        );
        assert_eq!(verify_signature(b"m", None, None), Verification::NotVerified);
    }

    #[test]
    fn tampered_message_fails() {
        let signer = signer();
        let signature = signer.sign_base64(b"original");
        assert_eq!(
            verify_signature(b"tampered", Some(&signature), Some(signer.public_key())),
            Verification::Failed
        );
    }

    #[test]
    fn rejects_other_algorithms() {
        let envelope = format!(
            r#"{{"algorithm":"RSA","key":{}}}"#,
            serde_json::to_string(signer().public_key()).unwrap()
        );
        assert!(matches!(
            decode_public_key(&envelope),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn rejects_short_seed() {
        assert!(matches!(
            Ed25519Signer::from_seed(&[1u8; 16]),
            Err(KeyError::InvalidLength { actual: 16, .. })
        ));
    }
}
