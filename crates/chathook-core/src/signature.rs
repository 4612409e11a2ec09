// Webhook signature verification (HMAC-SHA256)
//
// Validates that an inbound webhook body was produced by a trusted
// sender holding the shared secret. Pure function of body + secret:
// no side effects, never errors. A `false` return is an
// authentication failure and must not be retried.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies inbound webhook payloads against a pre-shared secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compute the hex-encoded HMAC-SHA256 signature for a payload
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a provided signature against a raw payload.
    ///
    /// Returns false for absent, malformed, or mismatched signatures.
    pub fn verify(&self, body: &[u8], provided: Option<&str>) -> bool {
        let Some(provided) = provided else {
            return false;
        };
        let expected = self.sign(body);
        // Constant-time comparison
        expected.len() == provided.len()
            && expected
                .as_bytes()
                .iter()
                .zip(provided.as_bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
