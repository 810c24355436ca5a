//! Core types for pixelchain mining
//!
//! Fundamental types used throughout the mining client with proper validation
//! and binary encoding: the pixel placement request, its fixed 8-byte payload,
//! the mining nonce, and the hashed block candidate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated pixel placement request
///
/// Construction checks every field against its declared bit width. The wire
/// payload is derived from the request, never the other way around, so an
/// out-of-range value is rejected before any bytes exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRequest {
    x: u16,
    y: u16,
    color: u32,
    new_difficulty: u8,
}

impl PixelRequest {
    /// Maximum color value (24-bit RGB)
    pub const COLOR_MAX: u32 = 0xFF_FFFF;

    /// Create a new pixel request, validating all field ranges
    pub fn new(x: u32, y: u32, color: u32, new_difficulty: u32) -> Result<Self> {
        if x > u16::MAX as u32 {
            return Err(Error::range("x", x as u64, u16::MAX as u64));
        }
        if y > u16::MAX as u32 {
            return Err(Error::range("y", y as u64, u16::MAX as u64));
        }
        if color > Self::COLOR_MAX {
            return Err(Error::range("color", color as u64, Self::COLOR_MAX as u64));
        }
        if new_difficulty > u8::MAX as u32 {
            return Err(Error::range(
                "new_difficulty",
                new_difficulty as u64,
                u8::MAX as u64,
            ));
        }

        Ok(Self {
            x: x as u16,
            y: y as u16,
            color,
            new_difficulty: new_difficulty as u8,
        })
    }

    /// X coordinate
    pub fn x(&self) -> u16 {
        self.x
    }

    /// Y coordinate
    pub fn y(&self) -> u16 {
        self.y
    }

    /// 24-bit RGB color
    pub fn color(&self) -> u32 {
        self.color
    }

    /// Requested difficulty for the placed pixel
    pub fn new_difficulty(&self) -> u8 {
        self.new_difficulty
    }

    /// Red component
    pub fn red(&self) -> u8 {
        ((self.color >> 16) & 0xFF) as u8
    }

    /// Green component
    pub fn green(&self) -> u8 {
        ((self.color >> 8) & 0xFF) as u8
    }

    /// Blue component
    pub fn blue(&self) -> u8 {
        (self.color & 0xFF) as u8
    }

    /// Encode the request into its fixed 8-byte payload
    ///
    /// Layout is big-endian, matching the server's `!HH3BB` pack format:
    /// `x_hi, x_lo, y_hi, y_lo, r, g, b, difficulty`.
    pub fn encode(&self) -> Payload {
        let [x_hi, x_lo] = self.x.to_be_bytes();
        let [y_hi, y_lo] = self.y.to_be_bytes();
        Payload([
            x_hi,
            x_lo,
            y_hi,
            y_lo,
            self.red(),
            self.green(),
            self.blue(),
            self.new_difficulty,
        ])
    }
}

impl fmt::Display for PixelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) #{:06x} +{}",
            self.x, self.y, self.color, self.new_difficulty
        )
    }
}

/// The 8-byte binary encoding of a pixel request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload([u8; 8]);

impl Payload {
    /// Payload size in bytes
    pub const SIZE: usize = 8;

    /// Get the payload bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Decode the payload back into its request fields
    pub fn decode(&self) -> PixelRequest {
        let [x_hi, x_lo, y_hi, y_lo, r, g, b, diff] = self.0;
        PixelRequest {
            x: u16::from_be_bytes([x_hi, x_lo]),
            y: u16::from_be_bytes([y_hi, y_lo]),
            color: ((r as u32) << 16) | ((g as u32) << 8) | (b as u32),
            new_difficulty: diff,
        }
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Proof-of-work nonce (8 bytes)
///
/// The protocol leaves the nonce encoding to the client; we use a u64
/// rendered big-endian so the submitted hex string and the hashed bytes
/// agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nonce(pub u64);

impl Nonce {
    /// Nonce size in bytes
    pub const SIZE: usize = 8;

    /// Create a new nonce
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the nonce value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Convert to bytes (big-endian)
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Increment nonce
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Add to nonce
    pub fn add(&mut self, value: u64) {
        self.0 = self.0.wrapping_add(value);
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Concatenate previous-block bytes, nonce bytes, and payload bytes into the
/// sequence that is hashed
///
/// Exact raw-byte concatenation in that fixed order: no delimiters, no
/// re-encoding. The server parses nothing out of this; the fixed payload
/// width and the server-assigned previous block make the layout unambiguous.
pub fn assemble(previous_block: &[u8], nonce: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(previous_block.len() + nonce.len() + payload.len());
    bytes.extend_from_slice(previous_block);
    bytes.extend_from_slice(nonce);
    bytes.extend_from_slice(payload);
    bytes
}

/// A preassembled block candidate with an injectable nonce region
///
/// The previous block and payload are fixed for the lifetime of one mining
/// job; only the nonce changes per attempt, so the buffer is built once and
/// the nonce bytes are overwritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCandidate {
    bytes: Vec<u8>,
    nonce_offset: usize,
}

impl BlockCandidate {
    /// Build a candidate from the previous block, an initial nonce, and the payload
    pub fn new(previous_block: &[u8], nonce: Nonce, payload: &Payload) -> Self {
        let bytes = assemble(previous_block, &nonce.to_bytes(), payload.as_bytes());
        let nonce_offset = previous_block.len();
        Self {
            bytes,
            nonce_offset,
        }
    }

    /// Get the candidate bytes to be hashed
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrite the nonce region with a new nonce
    pub fn inject_nonce(&mut self, nonce: Nonce) {
        self.bytes[self.nonce_offset..self.nonce_offset + Nonce::SIZE]
            .copy_from_slice(&nonce.to_bytes());
    }
}
