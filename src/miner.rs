//! Proof-of-work mining
//!
//! The miner searches for a nonce whose block digest starts with `difficulty`
//! zero hex characters, then seals the candidate and appends it to a chain.
//! The search is bounded by `max_attempts` and can be cancelled from another
//! thread through a [`CancelHandle`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::blockchain::{Block, CandidateBlock, Chain};
use crate::crypto::{has_leading_zeros, DIGEST_HEX_LEN};
use crate::error::{ChainError, Result};

pub const DEFAULT_DIFFICULTY: usize = 4;
pub const BLOCK_REWARD: u64 = 50;
pub const DEFAULT_MAX_ATTEMPTS: u64 = 500_000_000;

/// Workers check the cancel flag once per this many attempts.
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Running totals credited by the miner. Shared so statistics can be read
/// while a search is in progress.
#[derive(Debug, Default)]
pub struct RewardLedger {
    total_reward: AtomicU64,
    blocks_mined: AtomicU64,
}

impl RewardLedger {
    fn credit(&self, reward: u64) {
        self.total_reward.fetch_add(reward, Ordering::SeqCst);
        self.blocks_mined.fetch_add(1, Ordering::SeqCst);
    }

    pub fn total_reward(&self) -> u64 {
        self.total_reward.load(Ordering::SeqCst)
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::SeqCst)
    }
}

/// Requests that the search in progress stop at its next poll.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerSettings {
    pub difficulty: usize,
    pub block_reward: u64,
    pub max_attempts: u64,
    pub threads: usize,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            block_reward: BLOCK_REWARD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            threads: 1,
        }
    }
}

#[derive(Debug)]
pub struct Miner {
    settings: MinerSettings,
    ledger: Arc<RewardLedger>,
    cancel: CancelHandle,
    pool: Option<rayon::ThreadPool>,
}

impl Miner {
    pub fn new(settings: MinerSettings) -> Result<Self> {
        Self::with_shared(settings, Arc::default(), CancelHandle::default())
    }

    /// Builds a miner that credits `ledger` and obeys `cancel`, so a
    /// replacement miner keeps the state its owner already hands out.
    pub fn with_shared(
        settings: MinerSettings,
        ledger: Arc<RewardLedger>,
        cancel: CancelHandle,
    ) -> Result<Self> {
        if settings.difficulty > DIGEST_HEX_LEN {
            return Err(ChainError::InvalidDifficulty(settings.difficulty));
        }
        if settings.max_attempts == 0 {
            return Err(ChainError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if settings.threads == 0 {
            return Err(ChainError::ConfigError(
                "miner threads must be at least 1".to_string(),
            ));
        }

        let pool = if settings.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(settings.threads)
                    .thread_name(|i| format!("powchain-miner-{}", i))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            settings,
            ledger,
            cancel,
            pool,
        })
    }

    pub fn with_difficulty(difficulty: usize) -> Result<Self> {
        Self::new(MinerSettings {
            difficulty,
            ..MinerSettings::default()
        })
    }

    pub fn difficulty(&self) -> usize {
        self.settings.difficulty
    }

    pub fn settings(&self) -> &MinerSettings {
        &self.settings
    }

    pub fn ledger(&self) -> Arc<RewardLedger> {
        self.ledger.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Searches for a nonce that satisfies the difficulty and returns the
    /// solved candidate. Clears any earlier cancellation first.
    pub fn solve(&self, candidate: CandidateBlock) -> Result<CandidateBlock> {
        self.cancel.reset();
        debug!(
            id = candidate.id(),
            difficulty = self.settings.difficulty,
            threads = self.settings.threads,
            "mining.start"
        );
        match &self.pool {
            Some(pool) => self.solve_parallel(pool, candidate),
            None => self.solve_sequential(candidate),
        }
    }

    fn solve_sequential(&self, mut candidate: CandidateBlock) -> Result<CandidateBlock> {
        let difficulty = self.settings.difficulty;
        let mut attempts: u64 = 0;

        loop {
            candidate.recompute_digest();
            attempts += 1;

            if candidate.meets_difficulty(difficulty) {
                debug!(id = candidate.id(), nonce = candidate.nonce(), attempts, "mining.solved");
                return Ok(candidate);
            }
            if attempts >= self.settings.max_attempts {
                warn!(id = candidate.id(), attempts, difficulty, "mining.exhausted");
                return Err(ChainError::MiningExhausted {
                    attempts,
                    difficulty,
                });
            }
            if attempts % CANCEL_POLL_INTERVAL == 0 && self.cancel.is_cancelled() {
                warn!(id = candidate.id(), attempts, "mining.cancelled");
                return Err(ChainError::MiningCancelled { attempts });
            }
            candidate.increment_nonce()?;
        }
    }

    /// Each worker probes the strided sub-range `start + worker + k * workers`.
    /// The first worker to find a valid nonce raises `found`; the others stop
    /// and discard their progress.
    fn solve_parallel(
        &self,
        pool: &rayon::ThreadPool,
        mut candidate: CandidateBlock,
    ) -> Result<CandidateBlock> {
        let difficulty = self.settings.difficulty;
        let max_attempts = self.settings.max_attempts;
        let workers = pool.current_num_threads().max(1) as u64;
        let start = candidate.nonce();

        let found = AtomicBool::new(false);
        let overflowed = AtomicBool::new(false);
        let attempts = AtomicU64::new(0);
        let cancel = &self.cancel;
        let probe = &candidate;

        let winner = pool.install(|| {
            (0..workers).into_par_iter().find_map_any(|worker| {
                let quota = max_attempts / workers + u64::from(worker < max_attempts % workers);
                let mut local: u64 = 0;
                let mut offset = worker;

                let result = loop {
                    if local >= quota || found.load(Ordering::Relaxed) {
                        break None;
                    }
                    if local % CANCEL_POLL_INTERVAL == 0 && cancel.is_cancelled() {
                        break None;
                    }
                    let Some(nonce) = start.checked_add(offset) else {
                        overflowed.store(true, Ordering::Relaxed);
                        break None;
                    };
                    local += 1;
                    if has_leading_zeros(&probe.digest_with_nonce(nonce), difficulty) {
                        found.store(true, Ordering::SeqCst);
                        break Some(nonce);
                    }
                    offset = match offset.checked_add(workers) {
                        Some(next) => next,
                        None => {
                            overflowed.store(true, Ordering::Relaxed);
                            break None;
                        }
                    };
                };

                attempts.fetch_add(local, Ordering::Relaxed);
                result
            })
        });

        let attempts = attempts.load(Ordering::SeqCst);
        match winner {
            Some(nonce) => {
                candidate.set_nonce(nonce);
                debug!(id = candidate.id(), nonce, attempts, workers, "mining.solved");
                Ok(candidate)
            }
            None if cancel.is_cancelled() => {
                warn!(id = candidate.id(), attempts, "mining.cancelled");
                Err(ChainError::MiningCancelled { attempts })
            }
            None if overflowed.load(Ordering::SeqCst) => Err(ChainError::NonceOverflow(candidate.id())),
            None => {
                warn!(id = candidate.id(), attempts, difficulty, "mining.exhausted");
                Err(ChainError::MiningExhausted {
                    attempts,
                    difficulty,
                })
            }
        }
    }

    /// Seals a solved candidate, appends it to `chain` and credits the reward.
    pub fn commit(&self, candidate: CandidateBlock, chain: &mut Chain) -> Result<Block> {
        if !candidate.meets_difficulty(self.settings.difficulty) {
            return Err(ChainError::InvariantViolation(format!(
                "block {} does not meet difficulty {}",
                candidate.id(),
                self.settings.difficulty
            )));
        }

        let block = candidate.seal();
        if !block.has_valid_digest() {
            error!(id = block.id(), hash = block.hash(), "sealed block fails its own hash check");
            return Err(ChainError::InvariantViolation(format!(
                "block {} stores a hash that does not match its fields",
                block.id()
            )));
        }

        chain.append(block.clone());
        self.ledger.credit(self.settings.block_reward);
        info!(
            id = block.id(),
            nonce = block.nonce(),
            hash = block.hash(),
            height = chain.len() - 1,
            "Block appended"
        );
        Ok(block)
    }

    /// Runs the search and appends the result: exactly one block per call.
    pub fn mine(&self, candidate: CandidateBlock, chain: &mut Chain) -> Result<Block> {
        let solved = self.solve(candidate)?;
        self.commit(solved, chain)
    }
}
