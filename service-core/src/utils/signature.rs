use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Generate a hex-encoded HMAC-SHA512 signature over the raw payload bytes.
///
/// The payload must be the exact bytes received on the wire; a re-serialized
/// JSON document will not produce the same digest.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex-encoded HMAC-SHA512 signature using constant-time comparison.
///
/// Never fails: an empty secret, a missing signature or any mismatch are all
/// reported as `false`.
pub fn verify_payload_signature(secret: &[u8], payload: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };
    if secret.is_empty() {
        return false;
    }

    let Ok(expected_signature) = sign_payload(secret, payload) else {
        return false;
    };

    let expected_bytes = expected_signature.as_bytes();
    let signature = signature.to_ascii_lowercase();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(signature_bytes).into()
}
