//! CPU mining worker implementation
//!
//! Multi-threaded nonce search: each task owns its candidate buffer and a
//! disjoint nonce range, injecting nonces in place and scoring digests until
//! one passes or the search is cancelled.

use super::{check_candidate, compute_hash_rate, mining_span, MiningJob, MiningStats, MiningWorker, Solution};
use crate::{BlockCandidate, Error, Nonce, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Nonces checked between cancellation checks
const BATCH_SIZE: u64 = 10_000;

/// CPU mining worker using multiple tasks
pub struct CpuWorker {
    thread_count: usize,
    stats: Arc<CpuMiningStats>,
}

/// Thread-safe mining statistics for the CPU worker
#[derive(Debug)]
struct CpuMiningStats {
    total_hashes: AtomicU64,
    solutions_found: AtomicU64,
    start_time: Instant,
}

impl CpuMiningStats {
    fn new() -> Self {
        Self {
            total_hashes: AtomicU64::new(0),
            solutions_found: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    fn reset(&self) {
        self.total_hashes.store(0, Ordering::Relaxed);
        self.solutions_found.store(0, Ordering::Relaxed);
    }

    fn to_mining_stats(&self) -> MiningStats {
        let total_hashes = self.total_hashes.load(Ordering::Relaxed);
        let solutions = self.solutions_found.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();
        let elapsed_secs = elapsed.as_secs_f64();
        let rate = if elapsed_secs > 0.0 {
            total_hashes as f64 / elapsed_secs
        } else {
            0.0
        };

        MiningStats {
            total_hashes,
            solutions_found: solutions,
            mining_time_secs: elapsed.as_secs(),
            current_hash_rate: rate,
            average_hash_rate: rate,
        }
    }
}

impl CpuWorker {
    /// Create a new CPU worker with the given task count (0 = all cores)
    pub fn new(thread_count: usize) -> Self {
        let thread_count = if thread_count == 0 {
            num_cpus::get()
        } else {
            thread_count
        };

        info!("Creating CPU worker with {} threads", thread_count);

        Self {
            thread_count,
            stats: Arc::new(CpuMiningStats::new()),
        }
    }

    /// Mine using a single task
    async fn mine_thread(
        thread_id: usize,
        job: MiningJob,
        stats: Arc<CpuMiningStats>,
        cancellation: CancellationToken,
        solution_tx: mpsc::UnboundedSender<Solution>,
    ) -> Result<()> {
        debug!("Starting mining thread {}", thread_id);

        // Each thread searches a disjoint range: thread id in the upper 16
        // bits of the nonce.
        let thread_nonce_offset = (thread_id as u64) << 48;
        let mut nonce = Nonce::new(job.initial_nonce.value().wrapping_add(thread_nonce_offset));
        let mut candidate = BlockCandidate::new(&job.previous_block, nonce, &job.payload);
        let mut hashes_computed = 0u64;
        let mut last_progress = Instant::now();

        loop {
            if cancellation.is_cancelled() {
                debug!("Thread {} cancelled", thread_id);
                break;
            }

            for _ in 0..BATCH_SIZE {
                candidate.inject_nonce(nonce);

                if let Some((achieved, digest)) =
                    check_candidate(&candidate, job.algorithm, job.required_difficulty)?
                {
                    info!(
                        "Solution found by thread {} with nonce {} (achieved {})",
                        thread_id, nonce, achieved
                    );
                    stats.solutions_found.fetch_add(1, Ordering::Relaxed);

                    // Ignore a dropped receiver; another thread may have won.
                    let _ = solution_tx.send(Solution {
                        nonce,
                        digest,
                        achieved_difficulty: achieved,
                    });
                    return Ok(());
                }

                nonce.increment();
                hashes_computed += 1;
            }

            stats.total_hashes.fetch_add(BATCH_SIZE, Ordering::Relaxed);

            if last_progress.elapsed() >= Duration::from_secs(10) {
                let rate = compute_hash_rate(hashes_computed, stats.start_time.elapsed());
                debug!(
                    "Thread {} - {} hashes, {}",
                    thread_id,
                    hashes_computed,
                    crate::utils::format_hash_rate(rate)
                );
                last_progress = Instant::now();
            }

            // Yield so cancellation and stats tasks get scheduled.
            task::yield_now().await;
        }

        debug!("Thread {} completed with {} hashes", thread_id, hashes_computed);
        Ok(())
    }
}

#[async_trait]
impl MiningWorker for CpuWorker {
    fn worker_type(&self) -> &'static str {
        "cpu"
    }

    async fn mine(
        &mut self,
        job: MiningJob,
        cancellation: CancellationToken,
        stats_tx: Option<mpsc::UnboundedSender<MiningStats>>,
    ) -> Result<Solution> {
        let _span = mining_span(self.worker_type(), job.required_difficulty);

        info!(
            "Starting CPU mining with {} threads (required difficulty: {}, hash: {})",
            self.thread_count, job.required_difficulty, job.algorithm
        );

        self.stats.reset();

        let (solution_tx, mut solution_rx) = mpsc::unbounded_channel();

        let mut handles = Vec::new();
        for thread_id in 0..self.thread_count {
            let stats = Arc::clone(&self.stats);
            let job_clone = job.clone();
            let cancellation_clone = cancellation.clone();
            let solution_tx_clone = solution_tx.clone();

            let handle = task::spawn(async move {
                Self::mine_thread(
                    thread_id,
                    job_clone,
                    stats,
                    cancellation_clone,
                    solution_tx_clone,
                )
                .await
            });

            handles.push(handle);
        }

        // Drop the original sender so the channel closes when all threads finish
        drop(solution_tx);

        let stats_clone = Arc::clone(&self.stats);
        let stats_cancellation = cancellation.clone();
        let stats_handle = stats_tx.map(|stats_tx| {
            task::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(5));

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let _ = stats_tx.send(stats_clone.to_mining_stats());
                        }
                        _ = stats_cancellation.cancelled() => break,
                    }
                }
            })
        });

        let result = tokio::select! {
            solution = solution_rx.recv() => {
                match solution {
                    Some(solution) => Ok(solution),
                    None => Err(Error::worker("cpu", "All threads exited without a solution")),
                }
            }
            _ = cancellation.cancelled() => {
                info!("CPU mining cancelled");
                Err(Error::cancelled("CPU mining"))
            }
        };

        // Stop all threads and wait for completion
        cancellation.cancel();

        for handle in handles {
            let _ = handle.await;
        }

        if let Some(handle) = stats_handle {
            let _ = handle.await;
        }

        let final_stats = self.stats.to_mining_stats();
        info!(
            "CPU mining completed. Total hashes: {}, {}",
            final_stats.total_hashes,
            crate::utils::format_hash_rate(final_stats.average_hash_rate)
        );

        result
    }

    fn stats(&self) -> MiningStats {
        self.stats.to_mining_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HashAlgorithm;
    use crate::difficulty::{meets_difficulty, score};
    use crate::{assemble, PixelRequest};
    use assert_matches::assert_matches;

    fn easy_job() -> MiningJob {
        let payload = PixelRequest::new(1, 2, 0xFF0000, 0).unwrap().encode();
        MiningJob {
            previous_block: vec![0x7e; 32],
            payload,
            // A few nibbles of partial credit; found within a handful of
            // attempts on average.
            required_difficulty: 2,
            algorithm: HashAlgorithm::Sha256,
            initial_nonce: Nonce::new(0),
        }
    }

    #[tokio::test]
    async fn test_cpu_worker_creation() {
        let worker = CpuWorker::new(2);
        assert_eq!(worker.thread_count, 2);
        assert_eq!(worker.worker_type(), "cpu");

        let all_cores = CpuWorker::new(0);
        assert!(all_cores.thread_count >= 1);
    }

    #[tokio::test]
    async fn test_cpu_worker_finds_verifiable_solution() {
        let mut worker = CpuWorker::new(1);
        let job = easy_job();
        let cancellation = CancellationToken::new();

        let solution = worker
            .mine(job.clone(), cancellation, None)
            .await
            .expect("easy difficulty should be solvable");

        // Re-verify the solution the way the server would.
        let message = assemble(
            &job.previous_block,
            &solution.nonce.to_bytes(),
            job.payload.as_bytes(),
        );
        let digest = job.algorithm.digest_hex(&message);
        assert_eq!(digest, solution.digest);

        let achieved = score(&digest).unwrap();
        assert_eq!(achieved, solution.achieved_difficulty);
        assert!(meets_difficulty(achieved, job.required_difficulty));
    }

    #[tokio::test]
    async fn test_cpu_worker_cancellation() {
        let mut worker = CpuWorker::new(1);
        let mut job = easy_job();
        // Unreachable for SHA-256: more than 4 bits per digest nibble.
        job.required_difficulty = 1000;
        let cancellation = CancellationToken::new();

        cancellation.cancel();

        let result = worker.mine(job, cancellation, None).await;
        assert_matches!(result, Err(Error::Cancelled { .. }));
    }

    #[test]
    fn test_cpu_mining_stats() {
        let stats = CpuMiningStats::new();

        stats.total_hashes.store(1000, Ordering::Relaxed);
        stats.solutions_found.store(1, Ordering::Relaxed);

        let mining_stats = stats.to_mining_stats();
        assert_eq!(mining_stats.total_hashes, 1000);
        assert_eq!(mining_stats.solutions_found, 1);

        stats.reset();
        assert_eq!(stats.to_mining_stats().total_hashes, 0);
    }
}
