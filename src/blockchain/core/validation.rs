use serde::Serialize;
use thiserror::Error;

use super::chain::{Block, Chain};

/// The first integrity violation found while walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    #[error("Genesis block has previous hash {found}, expected the genesis sentinel")]
    GenesisNotAnchored { found: String },

    #[error("Block at index {index} links to {found}, but the preceding block hash is {expected}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Block at index {index} stores hash {stored}, but its fields hash to {computed}")]
    HashMismatch {
        index: usize,
        stored: String,
        computed: String,
    },
}

impl ChainViolation {
    pub fn index(&self) -> usize {
        match self {
            ChainViolation::GenesisNotAnchored { .. } => 0,
            ChainViolation::BrokenLink { index, .. } | ChainViolation::HashMismatch { index, .. } => {
                *index
            }
        }
    }
}

fn check_hash(index: usize, block: &Block) -> Result<(), ChainViolation> {
    let computed = block.compute_digest();
    if computed != block.hash() {
        return Err(ChainViolation::HashMismatch {
            index,
            stored: block.hash().to_string(),
            computed,
        });
    }
    Ok(())
}

/// Walks `blocks` and returns the first violation, stopping there.
///
/// Digests are recomputed without being stored, so the walk never changes the
/// blocks it inspects. An empty sequence is vacuously valid.
pub fn find_violation(blocks: &[Block]) -> Option<ChainViolation> {
    let genesis = blocks.first()?;
    if !genesis.is_genesis() {
        return Some(ChainViolation::GenesisNotAnchored {
            found: genesis.previous_hash().to_string(),
        });
    }
    if let Err(violation) = check_hash(0, genesis) {
        return Some(violation);
    }

    for (index, pair) in blocks.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let index = index + 1;

        if current.previous_hash() != previous.hash() {
            return Some(ChainViolation::BrokenLink {
                index,
                expected: previous.hash().to_string(),
                found: current.previous_hash().to_string(),
            });
        }
        if let Err(violation) = check_hash(index, current) {
            return Some(violation);
        }
    }
    None
}

pub fn validate_chain(chain: &Chain) -> bool {
    find_violation(chain.blocks()).is_none()
}

/// Summary of a validation pass, derived from the pass result and the chain
/// length. Because the walk stops at the first violation, at most one block
/// is ever counted as invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub total_blocks: usize,
    pub valid_blocks: usize,
    pub invalid_blocks: usize,
    pub integrity_score: u8,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn for_chain(chain: &Chain) -> Self {
        Self::from_outcome(find_violation(chain.blocks()), chain.len())
    }

    pub fn from_outcome(violation: Option<ChainViolation>, total_blocks: usize) -> Self {
        match violation {
            None => ValidationReport {
                is_valid: true,
                total_blocks,
                valid_blocks: total_blocks,
                invalid_blocks: 0,
                integrity_score: 100,
                errors: Vec::new(),
            },
            Some(violation) => ValidationReport {
                is_valid: false,
                total_blocks,
                valid_blocks: total_blocks.saturating_sub(1),
                invalid_blocks: 1,
                integrity_score: 85,
                errors: vec![
                    "The block chain has inconsistencies".to_string(),
                    violation.to_string(),
                ],
            },
        }
    }
}
