//! Payment confirmation signatures (hex-encoded HMAC-SHA256)

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `intent_id|confirmation_id`
pub fn signature_payload(intent_id: &str, confirmation_id: &str) -> String {
    format!("{intent_id}|{confirmation_id}")
}

pub fn sign(secret: &str, payload: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature.
pub fn verify(secret: &str, payload: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else { return false };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else { return false };
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
