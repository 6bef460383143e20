//! Value encodings for cache attributes.
//!
//! Writers always produce decimal integers, lowercase hex digests in the
//! per-field attributes and standard base64 digests in the stamp. Readers
//! also accept the formats older tools left behind: 8-byte big-endian
//! integers, raw digest bytes and URL-safe base64.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;

/// Decode a cached integer.
///
/// Accepts base-10 ASCII (optional leading `-`) or exactly 8 raw bytes
/// holding a big-endian `i64`.
#[must_use]
pub fn decode_int(input: &[u8]) -> Option<i64> {
    if let Some(value) = std::str::from_utf8(input)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
    {
        return Some(value);
    }
    let raw: [u8; 8] = input.try_into().ok()?;
    Some(i64::from_be_bytes(raw))
}

/// Decode a digest of exactly `N` bytes.
///
/// Candidates, first structurally valid one wins:
/// 1. raw bytes of length `N`
/// 2. hex of length `2N`
/// 3. standard base64 (padded)
/// 4. URL-safe base64 (padded)
#[must_use]
pub fn decode_hash<const N: usize>(input: &[u8]) -> Option<[u8; N]> {
    if input.len() == N {
        return input.try_into().ok();
    }

    if input.len() == N * 2 {
        let mut out = [0u8; N];
        if hex::decode_to_slice(input, &mut out).is_ok() {
            return Some(out);
        }
    }

    if input.len() == base64_len(N) {
        for engine in [&STANDARD, &URL_SAFE] {
            if let Ok(decoded) = engine.decode(input) {
                if let Ok(out) = <[u8; N]>::try_from(decoded.as_slice()) {
                    return Some(out);
                }
            }
        }
    }

    None
}

/// Padded base64 length for `n` input bytes.
const fn base64_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}

#[must_use]
pub fn encode_int(value: i64) -> String {
    value.to_string()
}

/// Lowercase hex, as stored in the per-field attributes.
#[must_use]
pub fn encode_hex(digest: &[u8]) -> String {
    hex::encode(digest)
}

/// Standard padded base64, as stored in the stamp.
#[must_use]
pub fn encode_b64(digest: &[u8]) -> String {
    STANDARD.encode(digest)
}
