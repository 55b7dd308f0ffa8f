//! Blockchain service facade
//!
//! Owns the process-wide chain, the miner and the identifier counter, and
//! exposes the operations the adapters (HTTP API, CLI) call into.
//!
//! Block production is serialized by the producer mutex. The proof-of-work
//! search runs while only that mutex is held, so readers keep seeing the last
//! committed chain through the `RwLock` until the append.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{info, warn};

use crate::blockchain::{validate_chain, Block, CandidateBlock, Chain, ValidationReport};
use crate::config::{Config, DEFAULT_BLOCK_CONTENT, DEFAULT_GENESIS_CONTENT};
use crate::error::{ChainError, Result};
use crate::miner::{CancelHandle, Miner, MinerSettings, RewardLedger};

struct BlockProducer {
    miner: Miner,
    next_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainInfo {
    pub blocks: Vec<Block>,
    pub total_blocks: usize,
    pub is_valid: bool,
    pub last_block_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainStats {
    pub total_blocks: usize,
    pub is_chain_valid: bool,
    pub difficulty: usize,
    pub total_reward: u64,
    pub blocks_mined: u64,
}

pub struct BlockchainService {
    chain: RwLock<Chain>,
    producer: Mutex<BlockProducer>,
    ledger: Arc<RewardLedger>,
    cancel: CancelHandle,
    difficulty: usize,
    default_content: String,
}

impl BlockchainService {
    /// Builds the service and mines the genesis block, so callers never
    /// observe an empty chain.
    pub fn new(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ChainError::ConfigError(e.to_string()))?;
        Self::with_settings(
            config.miner_settings(),
            &config.chain.genesis_content,
            &config.chain.default_content,
        )
    }

    pub fn with_difficulty(difficulty: usize) -> Result<Self> {
        Self::with_settings(
            MinerSettings {
                difficulty,
                ..MinerSettings::default()
            },
            DEFAULT_GENESIS_CONTENT,
            DEFAULT_BLOCK_CONTENT,
        )
    }

    pub fn with_settings(
        settings: MinerSettings,
        genesis_content: &str,
        default_content: &str,
    ) -> Result<Self> {
        let miner = Miner::new(settings)?;
        let difficulty = miner.difficulty();
        let ledger = miner.ledger();
        let cancel = miner.cancel_handle();

        let mut chain = Chain::new();
        let genesis = CandidateBlock::new(0, genesis_content, chain.tail_digest());
        let genesis = miner.mine(genesis, &mut chain)?;
        info!(hash = genesis.hash(), difficulty, "Genesis block mined");

        Ok(Self {
            chain: RwLock::new(chain),
            producer: Mutex::new(BlockProducer { miner, next_id: 1 }),
            ledger,
            cancel,
            difficulty,
            default_content: default_content.to_string(),
        })
    }

    pub fn get_all_blocks(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }

    pub fn get_block_by_id(&self, id: u64) -> Option<Block> {
        self.chain.read().by_id(id).cloned()
    }

    pub fn size(&self) -> usize {
        self.chain.read().len()
    }

    /// Copy of the chain as of the last committed block.
    pub fn snapshot(&self) -> Chain {
        self.chain.read().clone()
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Mines a new block carrying `content` on top of the current tail.
    /// Blank content is replaced by the configured placeholder.
    ///
    /// The identifier is consumed only once the block is appended.
    pub fn create_block(&self, content: &str) -> Result<Block> {
        let content = if content.trim().is_empty() {
            self.default_content.as_str()
        } else {
            content
        };

        let mut producer = self.producer.lock();
        let id = producer.next_id;
        let previous_hash = self.chain.read().tail_digest().to_string();

        let candidate = CandidateBlock::new(id, content, previous_hash);
        let solved = producer.miner.solve(candidate)?;
        let block = producer.miner.commit(solved, &mut self.chain.write())?;
        producer.next_id += 1;

        info!(id, hash = block.hash(), "Block created");
        Ok(block)
    }

    /// Stops the search currently run by `create_block`, if any.
    pub fn cancel_mining(&self) {
        self.cancel.cancel();
    }

    /// Installs a miner with `settings` that shares this service's ledger and
    /// cancel handle, returning the previous one.
    #[cfg(test)]
    fn replace_miner(&self, settings: MinerSettings) -> Result<Miner> {
        let miner = Miner::with_shared(settings, self.ledger.clone(), self.cancel.clone())?;
        Ok(std::mem::replace(&mut self.producer.lock().miner, miner))
    }

    pub fn validate_chain(&self) -> bool {
        validate_chain(&self.chain.read())
    }

    pub fn validate(&self) -> ValidationReport {
        let report = ValidationReport::for_chain(&self.chain.read());
        if !report.is_valid {
            warn!(errors = ?report.errors, "Chain validation failed");
        }
        report
    }

    pub fn info(&self) -> ChainInfo {
        let chain = self.chain.read();
        ChainInfo {
            blocks: chain.blocks().to_vec(),
            total_blocks: chain.len(),
            is_valid: validate_chain(&chain),
            last_block_hash: chain.last().map(|b| b.hash().to_string()),
        }
    }

    pub fn stats(&self) -> ChainStats {
        let (total_blocks, is_chain_valid) = {
            let chain = self.chain.read();
            (chain.len(), validate_chain(&chain))
        };
        ChainStats {
            total_blocks,
            is_chain_valid,
            difficulty: self.difficulty,
            total_reward: self.ledger.total_reward(),
            blocks_mined: self.ledger.blocks_mined(),
        }
    }
}
