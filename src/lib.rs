//! Pixelchain Mining Client
//!
//! A proof-of-work client for collaborative pixelchain canvases:
//! - Fixed 8-byte big-endian payload encoding of pixel placements
//! - Partial-credit leading-zero difficulty scoring over hex digests
//! - Raw-byte block candidate assembly (previous block ++ nonce ++ payload)
//! - Multi-threaded CPU nonce search with cooperative cancellation
//! - HTTP client for the canvas server API

pub mod client;
pub mod config;
pub mod crypto;
pub mod difficulty;
pub mod error;
pub mod types;
pub mod utils;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

/// Application information
pub const APP_NAME: &str = "pixelchain-mining-client";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
