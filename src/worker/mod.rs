//! Mining worker implementations
//!
//! The nonce search that drives the pure core: assemble a candidate, hash it,
//! score the digest, and stop on the first passing nonce or on cancellation.

use crate::crypto::HashAlgorithm;
use crate::difficulty::{meets_difficulty, score};
use crate::{BlockCandidate, Nonce, Payload, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Span;

pub mod cpu;

pub use cpu::CpuWorker;

/// One mining job: everything needed to search for a passing nonce
#[derive(Debug, Clone)]
pub struct MiningJob {
    /// Raw bytes of the pixel's previous block
    pub previous_block: Vec<u8>,
    /// Encoded placement request
    pub payload: Payload,
    /// Total difficulty the digest must achieve
    pub required_difficulty: u32,
    /// Hash algorithm the server verifies with
    pub algorithm: HashAlgorithm,
    /// Starting point for the nonce search
    pub initial_nonce: Nonce,
}

/// A passing nonce together with its digest and achieved difficulty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub nonce: Nonce,
    pub digest: String,
    pub achieved_difficulty: u32,
}

/// Mining statistics for a worker
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Total hashes computed
    pub total_hashes: u64,
    /// Number of solutions found
    pub solutions_found: u64,
    /// Time spent mining (seconds)
    pub mining_time_secs: u64,
    /// Current hash rate (hashes per second)
    pub current_hash_rate: f64,
    /// Average hash rate (hashes per second)
    pub average_hash_rate: f64,
}

/// Mining worker trait
///
/// Workers must respect the cancellation token and stop searching when
/// cancelled; the core scoring functions themselves never block, so
/// cancellation is purely cooperative between iterations.
#[async_trait]
pub trait MiningWorker: Send + Sync {
    /// Get the worker type name for logging
    fn worker_type(&self) -> &'static str;

    /// Search for a nonce whose digest meets the job's required difficulty
    async fn mine(
        &mut self,
        job: MiningJob,
        cancellation: CancellationToken,
        stats_tx: Option<mpsc::UnboundedSender<MiningStats>>,
    ) -> Result<Solution>;

    /// Get current mining statistics
    fn stats(&self) -> MiningStats {
        MiningStats::default()
    }
}

/// Score one candidate: hash it and compare against the required difficulty
///
/// Returns the achieved difficulty and digest when the candidate passes.
pub fn check_candidate(
    candidate: &BlockCandidate,
    algorithm: HashAlgorithm,
    required_difficulty: u32,
) -> Result<Option<(u32, String)>> {
    let digest = algorithm.digest_hex(candidate.bytes());
    let achieved = score(&digest)?;
    if meets_difficulty(achieved, required_difficulty) {
        Ok(Some((achieved, digest)))
    } else {
        Ok(None)
    }
}

/// Utility function to compute hash rate over a time period
pub fn compute_hash_rate(hashes: u64, elapsed: Duration) -> f64 {
    if elapsed.as_secs_f64() > 0.0 {
        hashes as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    }
}

/// Create a tracing span for mining operations
pub fn mining_span(worker_type: &str, required_difficulty: u32) -> Span {
    tracing::info_span!(
        "mining",
        worker_type = worker_type,
        required_difficulty = required_difficulty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelRequest;

    fn test_job(required_difficulty: u32) -> MiningJob {
        let payload = PixelRequest::new(3, 7, 0x00FF00, 1).unwrap().encode();
        MiningJob {
            previous_block: vec![0xAB; 32],
            payload,
            required_difficulty,
            algorithm: HashAlgorithm::Sha256,
            initial_nonce: Nonce::new(0),
        }
    }

    #[test]
    fn test_check_candidate_trivial_difficulty() {
        let job = test_job(0);
        let candidate = BlockCandidate::new(&job.previous_block, job.initial_nonce, &job.payload);

        // Difficulty 0 is met by every digest.
        let result = check_candidate(&candidate, job.algorithm, 0).unwrap();
        let (achieved, digest) = result.expect("difficulty 0 must always pass");
        assert_eq!(digest.len(), 64);
        assert_eq!(achieved, score(&digest).unwrap());
    }

    #[test]
    fn test_check_candidate_impossible_difficulty() {
        let job = test_job(0);
        let candidate = BlockCandidate::new(&job.previous_block, job.initial_nonce, &job.payload);

        // 4 bits per nibble times 64 nibbles is the ceiling for SHA-256.
        let result = check_candidate(&candidate, HashAlgorithm::Sha256, 257).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_check_candidate_matches_manual_pipeline() {
        let job = test_job(0);
        let candidate = BlockCandidate::new(&job.previous_block, Nonce::new(42), &job.payload);

        let manual = crate::assemble(
            &job.previous_block,
            &Nonce::new(42).to_bytes(),
            job.payload.as_bytes(),
        );
        assert_eq!(candidate.bytes(), &manual[..]);
        assert_eq!(
            job.algorithm.digest_hex(candidate.bytes()),
            job.algorithm.digest_hex(&manual)
        );
    }

    #[test]
    fn test_compute_hash_rate() {
        assert_eq!(compute_hash_rate(1000, Duration::from_secs(10)), 100.0);
        assert_eq!(compute_hash_rate(0, Duration::from_secs(10)), 0.0);
        assert_eq!(compute_hash_rate(1000, Duration::from_secs(0)), 0.0);
    }

    #[test]
    fn test_mining_stats_default() {
        let stats = MiningStats::default();
        assert_eq!(stats.total_hashes, 0);
        assert_eq!(stats.solutions_found, 0);
    }
}
