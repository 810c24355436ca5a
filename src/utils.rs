//! Utility functions and helpers
//!
//! Hex codec and small formatting helpers used throughout the mining client.

use crate::{Error, Result};

/// Decode a hexadecimal string into bytes
///
/// Case-insensitive. Fails on odd-length input or on a non-hex character,
/// identifying the offending character and its position.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| match e {
        hex::FromHexError::OddLength => Error::OddHexLength { len: s.len() },
        hex::FromHexError::InvalidHexCharacter { c, index } => {
            Error::InvalidHexit { ch: c, index }
        }
        hex::FromHexError::InvalidStringLength => Error::OddHexLength { len: s.len() },
    })
}

/// Encode bytes as a lowercase hexadecimal string
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Validate hex string format
pub fn validate_hex_string(s: &str, expected_len: Option<usize>) -> Result<()> {
    if let Some(len) = expected_len {
        if s.len() != len {
            return Err(Error::config(format!(
                "Expected hex length {}, got {}",
                len,
                s.len()
            )));
        }
    }

    if let Some((index, ch)) = s.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(Error::InvalidHexit { ch, index });
    }

    Ok(())
}

/// Format hash rate as a human-readable string
pub fn format_hash_rate(hashes_per_sec: f64) -> String {
    const UNITS: &[&str] = &["H/s", "KH/s", "MH/s", "GH/s", "TH/s"];
    let mut rate = hashes_per_sec;
    let mut unit_index = 0;

    while rate >= 1000.0 && unit_index < UNITS.len() - 1 {
        rate /= 1000.0;
        unit_index += 1;
    }

    format!("{:.2} {}", rate, UNITS[unit_index])
}

/// Format duration as a human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        format!("{}h {}m {}s", hours, minutes, seconds % 60)
    }
}
