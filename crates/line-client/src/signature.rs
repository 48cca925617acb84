//! Webhook signature verification.
//!
//! LINE signs every webhook body with HMAC-SHA256 keyed by the channel
//! secret and sends the base64 digest in `X-Line-Signature`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::LineError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Compute the base64 signature for a webhook body.
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String, LineError> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|e| LineError::Config(format!("invalid channel secret: {}", e)))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check a webhook body against its `X-Line-Signature` value.
///
/// Comparison is constant-time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let body = br#"{"destination":"U","events":[]}"#;
        let signature = sign("secret", body).unwrap();

        assert!(verify_signature("secret", body, &signature));
        assert!(!verify_signature("other-secret", body, &signature));
        assert!(!verify_signature("secret", b"tampered", &signature));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(!verify_signature("secret", b"{}", "not base64!"));
        assert!(!verify_signature("secret", b"{}", ""));
    }
}
