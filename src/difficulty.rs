//! Difficulty scoring over hex digests
//!
//! Implements the pixelchain partial-credit leading-zero count: the digest is
//! walked nibble by nibble and each position contributes credit according to
//! how many of its high bits are zero. The walk stops after the first nibble
//! that is not `0`, whose partial credit still counts.

use crate::{Error, Result};

/// Credit contributed by a single hex digit of the digest
///
/// `'0'` is worth a full 4 bits; `'1'` three leading zero bits; `'2'`/`'3'`
/// two; `'4'`–`'7'` one; `'8'`–`'f'` none. Case-insensitive.
fn nibble_credit(ch: char, index: usize) -> Result<u32> {
    match ch.to_ascii_lowercase() {
        '0' => Ok(4),
        '1' => Ok(3),
        '2' | '3' => Ok(2),
        '4'..='7' => Ok(1),
        '8' | '9' | 'a'..='f' => Ok(0),
        _ => Err(Error::InvalidHexit { ch, index }),
    }
}

/// Compute the achieved difficulty of a hex digest
///
/// Walks the digest left to right, summing per-nibble credit, and stops after
/// the first non-`'0'` character (its credit is included). The result is
/// unbounded by design: any cap on acceptable difficulty belongs to request
/// validation, not to scoring. No digest length is assumed.
pub fn score(digest_hex: &str) -> Result<u32> {
    let mut achieved = 0;
    for (index, ch) in digest_hex.char_indices() {
        achieved += nibble_credit(ch, index)?;
        if ch != '0' {
            break;
        }
    }
    Ok(achieved)
}

/// Check whether an achieved difficulty satisfies a required threshold
pub fn meets_difficulty(achieved: u32, required: u32) -> bool {
    achieved >= required
}
