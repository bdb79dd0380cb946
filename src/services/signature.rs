use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Provider-Signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("signature is not valid base64")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies provider callbacks signed with HMAC-SHA256 over the raw body.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Arc<[u8]>,
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    /// Base64 signature for `body`, as the provider computes it.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of `signature` against `body`.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::Missing)?;
        let expected = STANDARD
            .decode(signature)
            .map_err(|_| SignatureError::Malformed)?;

        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"data":{"ref":"abc","status":"successful","client":"x"}}"#;

    #[test]
    fn accepts_own_signature() {
        let verifier = SignatureVerifier::new("test_secret_key");
        let signature = verifier.sign(BODY);
        assert_eq!(verifier.verify(BODY, Some(&signature)), Ok(()));
    }

    #[test]
    fn signature_matches_hmac_crate_directly() {
        let mut mac = HmacSha256::new_from_slice(b"test_secret_key").unwrap();
        mac.update(BODY);
        let expected = STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(SignatureVerifier::new("test_secret_key").sign(BODY), expected);
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = SignatureVerifier::new("test_secret_key");
        let signature = verifier.sign(BODY);
        let tampered = br#"{"data":{"ref":"abc","status":"successful","client":"y"}}"#;
        assert_eq!(
            verifier.verify(tampered, Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let signature = SignatureVerifier::new("other").sign(BODY);
        assert_eq!(
            SignatureVerifier::new("test_secret_key").verify(BODY, Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        let verifier = SignatureVerifier::new("test_secret_key");
        assert_eq!(verifier.verify(BODY, None), Err(SignatureError::Missing));
        assert_eq!(verifier.verify(BODY, Some("  ")), Err(SignatureError::Missing));
        assert_eq!(
            verifier.verify(BODY, Some("not base64!")),
            Err(SignatureError::Malformed)
        );
    }
}
