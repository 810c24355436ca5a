//! Digest providers for mining
//!
//! The pixelchain server is configured with one fixed-length hash function and
//! advertises its name via `/config/`. The client must hash candidates with
//! the same algorithm; scoring itself is algorithm-agnostic and only sees the
//! hex digest.

use crate::{Error, Result};
use blake2::{Blake2b512, Blake2s256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// Hash algorithms supported for block candidates
///
/// The subset of the server's allowed algorithms this client can compute.
/// Unknown or unsupported names fail at configuration time rather than
/// silently mis-hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Blake2s,
    Blake2b,
}

impl HashAlgorithm {
    /// Hash data and return the lowercase hexadecimal digest
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha224 => hex::encode(Sha224::digest(data)),
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            HashAlgorithm::Sha384 => hex::encode(Sha384::digest(data)),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
            HashAlgorithm::Blake2s => hex::encode(Blake2s256::digest(data)),
            HashAlgorithm::Blake2b => hex::encode(Blake2b512::digest(data)),
        }
    }

    /// Digest length in hex characters
    pub fn digest_hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha224 => 56,
            HashAlgorithm::Sha256 | HashAlgorithm::Blake2s => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 | HashAlgorithm::Blake2b => 128,
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake2s" => Ok(HashAlgorithm::Blake2s),
            "blake2b" => Ok(HashAlgorithm::Blake2b),
            other => Err(Error::config(format!(
                "Unsupported hash algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake2s => "blake2s",
            HashAlgorithm::Blake2b => "blake2b",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            HashAlgorithm::Sha256.digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        for algo in [
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
            HashAlgorithm::Blake2s,
            HashAlgorithm::Blake2b,
        ] {
            let digest = algo.digest_hex(b"pixel");
            assert_eq!(digest.len(), algo.digest_hex_len());
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(digest, digest.to_lowercase());
        }
    }

    #[test]
    fn test_digest_is_deterministic() {
        let a = HashAlgorithm::Blake2s.digest_hex(b"data");
        let b = HashAlgorithm::Blake2s.digest_hex(b"data");
        assert_eq!(a, b);
        assert_ne!(a, HashAlgorithm::Blake2s.digest_hex(b"other"));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!(
            "sha256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Sha256
        );
        assert_eq!(
            "blake2b".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Blake2b
        );
        assert!("sha3_256".parse::<HashAlgorithm>().is_err());
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for algo in [HashAlgorithm::Sha512, HashAlgorithm::Blake2s] {
            assert_eq!(algo.to_string().parse::<HashAlgorithm>().unwrap(), algo);
        }
    }
}
