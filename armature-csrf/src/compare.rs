//! Timing-safe string comparison.
//!
//! [`constant_time_eq`] is the native comparator built on `subtle`.
//! [`timing_safe_eq`] layers the double HMAC pattern on top of it: both
//! inputs are MACed under a fresh random key and the fixed-length digests are
//! compared, so timing reveals nothing about which bytes of the inputs differ.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const HMAC_KEY_LENGTH: usize = 32;

/// Constant-time byte comparison.
///
/// Returns `false` for inputs of different length without looking at their
/// content.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Double HMAC comparison of two strings.
///
/// Requires both the HMAC digests and the raw inputs to match.
pub fn timing_safe_eq(a: &str, b: &str) -> bool {
    let mut key = [0u8; HMAC_KEY_LENGTH];
    rand::thread_rng().fill_bytes(&mut key);

    let (Some(ah), Some(bh)) = (hmac_digest(&key, a), hmac_digest(&key, b)) else {
        return false;
    };

    let digests_match = constant_time_eq(&ah, &bh);
    let inputs_match = constant_time_eq(a.as_bytes(), b.as_bytes());

    digests_match & inputs_match
}

fn hmac_digest(key: &[u8], data: &str) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(data.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}
