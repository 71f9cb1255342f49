//! Webhook signature: base64(HMAC-SHA256(channel_secret, raw_body)) in `X-Line-Signature`.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing X-Line-Signature header")]
    Missing,
    #[error("signature is not valid base64")]
    Encoding,
    #[error("invalid channel secret")]
    Key,
    #[error("signature mismatch")]
    Mismatch,
}

/// Compute the header value LINE would send for `body`.
pub fn sign_body(channel_secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| SignatureError::Key)?;
    mac.update(body);
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a signature header against the raw body. Comparison is constant-time.
pub fn verify_signature(
    channel_secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), SignatureError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(SignatureError::Missing);
    }
    let provided = base64::engine::general_purpose::STANDARD
        .decode(signature)
        .map_err(|_| SignatureError::Encoding)?;
    let mut mac =
        HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| SignatureError::Key)?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}
