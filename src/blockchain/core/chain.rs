use crate::crypto::{has_leading_zeros, sha256_hex, HexDigest};
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};

/// Previous-digest value of the genesis block. Not itself a digest.
pub const GENESIS_SENTINEL: &str = "0";

/// Builds the canonical text that is hashed to seal a block.
///
/// Field order and formatting are fixed; any change produces digests that no
/// longer match previously mined chains.
pub fn canonical_encoding(
    id: u64,
    previous_hash: &str,
    timestamp: u64,
    content: &str,
    nonce: u64,
) -> String {
    format!(
        "{{id:{},hashPrevio:{},timeStamp:{},contenido:{},nonce:{}}}",
        id, previous_hash, timestamp, content, nonce
    )
}

pub fn compute_block_hash(
    id: u64,
    previous_hash: &str,
    timestamp: u64,
    content: &str,
    nonce: u64,
) -> HexDigest {
    sha256_hex(canonical_encoding(id, previous_hash, timestamp, content, nonce).as_bytes())
}

fn now_millis() -> u64 {
    // Clamp pre-epoch clocks to zero rather than wrapping.
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// A block under construction. Only the miner mutates it, and only before
/// it is sealed into a [`Block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBlock {
    id: u64,
    nonce: u64,
    timestamp: u64,
    hash: HexDigest,
    previous_hash: HexDigest,
    content: String,
}

impl CandidateBlock {
    pub fn new(id: u64, content: impl Into<String>, previous_hash: impl Into<String>) -> Self {
        Self::with_timestamp(id, content, previous_hash, now_millis())
    }

    /// Create a candidate with an explicit timestamp (for testing / determinism).
    pub fn with_timestamp(
        id: u64,
        content: impl Into<String>,
        previous_hash: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        let mut candidate = CandidateBlock {
            id,
            nonce: 0,
            timestamp,
            hash: String::new(),
            previous_hash: previous_hash.into(),
            content: content.into(),
        };
        candidate.recompute_digest();
        candidate
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Digest of the current fields with `nonce` substituted. Does not touch
    /// the stored digest, so parallel workers can probe nonces concurrently.
    pub fn digest_with_nonce(&self, nonce: u64) -> HexDigest {
        compute_block_hash(
            self.id,
            &self.previous_hash,
            self.timestamp,
            &self.content,
            nonce,
        )
    }

    /// Re-derives the stored digest from the current field values.
    pub(crate) fn recompute_digest(&mut self) {
        self.hash = self.digest_with_nonce(self.nonce);
    }

    /// Advances the nonce by one; overflow is an error, never a wrap.
    pub(crate) fn increment_nonce(&mut self) -> Result<()> {
        self.nonce = self
            .nonce
            .checked_add(1)
            .ok_or(ChainError::NonceOverflow(self.id))?;
        Ok(())
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.recompute_digest();
    }

    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        has_leading_zeros(&self.hash, difficulty)
    }

    /// Freezes the candidate into an immutable block.
    pub(crate) fn seal(self) -> Block {
        Block {
            id: self.id,
            nonce: self.nonce,
            timestamp: self.timestamp,
            hash: self.hash,
            previous_hash: self.previous_hash,
            content: self.content,
        }
    }
}

/// A sealed block. Fields are read-only outside the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub(crate) id: u64,
    pub(crate) nonce: u64,
    pub(crate) timestamp: u64,
    pub(crate) hash: HexDigest,
    pub(crate) previous_hash: HexDigest,
    pub(crate) content: String,
}

impl Block {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The stored digest.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_SENTINEL
    }

    /// Recomputes the digest from the current fields without storing it.
    pub fn compute_digest(&self) -> HexDigest {
        compute_block_hash(
            self.id,
            &self.previous_hash,
            self.timestamp,
            &self.content,
            self.nonce,
        )
    }

    pub fn has_valid_digest(&self) -> bool {
        self.compute_digest() == self.hash
    }

    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        has_leading_zeros(&self.hash, difficulty)
    }
}

/// Ordered, append-only sequence of blocks. Index 0 is the genesis block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing block sequence without checking it. Run the
    /// validator to certify an imported chain.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Chain { blocks }
    }

    /// Adds `block` as the new tail. No validation is performed here.
    pub fn append(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Digest of the last block, or [`GENESIS_SENTINEL`] when empty.
    pub fn tail_digest(&self) -> &str {
        self.blocks
            .last()
            .map(|b| b.hash.as_str())
            .unwrap_or(GENESIS_SENTINEL)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// First block carrying `id`. Identifiers are not enforced to be unique.
    pub fn by_id(&self, id: u64) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    #[cfg(test)]
    pub(crate) fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed(id: u64, content: &str, prev: &str) -> Block {
        CandidateBlock::with_timestamp(id, content, prev, 1_672_531_200_000).seal()
    }

    #[test]
    fn test_canonical_encoding_layout() {
        let encoded = canonical_encoding(3, "abc", 1700, "hola", 9);
        assert_eq!(
            encoded,
            "{id:3,hashPrevio:abc,timeStamp:1700,contenido:hola,nonce:9}"
        );
    }

    #[test]
    fn test_candidate_digest_computed_at_construction() {
        let candidate = CandidateBlock::new(0, "genesis", GENESIS_SENTINEL);
        assert_eq!(candidate.nonce(), 0);
        assert_eq!(candidate.hash().len(), 64);
        assert_eq!(candidate.hash(), candidate.digest_with_nonce(0));
    }

    #[test]
    fn test_increment_nonce_changes_digest_after_recompute() {
        let mut candidate = CandidateBlock::with_timestamp(1, "data", "prev", 42);
        let before = candidate.hash().to_string();
        candidate.increment_nonce().unwrap();
        assert_eq!(candidate.nonce(), 1);
        // Stored digest only changes on explicit recompute.
        assert_eq!(candidate.hash(), before);
        candidate.recompute_digest();
        assert_ne!(candidate.hash(), before);
        assert_eq!(candidate.hash(), candidate.digest_with_nonce(1));
    }

    #[test]
    fn test_increment_nonce_overflow_is_an_error() {
        let mut candidate = CandidateBlock::with_timestamp(7, "data", "prev", 42);
        candidate.set_nonce(u64::MAX);
        assert_eq!(candidate.increment_nonce(), Err(ChainError::NonceOverflow(7)));
        assert_eq!(candidate.nonce(), u64::MAX);
    }

    #[test]
    fn test_same_fields_same_digest() {
        let a = sealed(1, "hello", "prev");
        let b = sealed(1, "hello", "prev");
        assert_eq!(a.hash(), b.hash());
        assert!(a.has_valid_digest());
    }

    #[test]
    fn test_tampered_block_fails_digest_check() {
        let mut block = sealed(1, "hello", "prev");
        block.content = "tampered".to_string();
        assert!(!block.has_valid_digest());
        // Recomputation is read-only.
        assert_ne!(block.compute_digest(), block.hash());
    }

    #[test]
    fn test_tail_digest_on_empty_chain_is_sentinel() {
        let chain = Chain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.tail_digest(), GENESIS_SENTINEL);
    }

    #[test]
    fn test_append_and_lookup() {
        let mut chain = Chain::new();
        let genesis = sealed(0, "genesis", GENESIS_SENTINEL);
        let genesis_hash = genesis.hash().to_string();
        chain.append(genesis);
        chain.append(sealed(1, "second", &genesis_hash));

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.get(1).map(|b| b.content()), Some("second"));
        assert!(chain.get(2).is_none());
        assert_eq!(chain.by_id(0).map(|b| b.content()), Some("genesis"));
        assert!(chain.by_id(999).is_none());
        assert_eq!(chain.tail_digest(), chain.get(1).unwrap().hash());
    }

    #[test]
    fn test_duplicate_ids_return_first_match() {
        let mut chain = Chain::new();
        chain.append(sealed(5, "first", GENESIS_SENTINEL));
        chain.append(sealed(5, "second", "whatever"));
        assert_eq!(chain.by_id(5).map(|b| b.content()), Some("first"));
    }

    #[test]
    fn test_block_serializes_expected_fields() {
        let block = sealed(2, "payload", "prev");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["nonce"], 0);
        assert_eq!(json["content"], "payload");
        assert_eq!(json["previous_hash"], "prev");
        assert_eq!(json["hash"], block.hash());
        assert!(json["timestamp"].is_number());
    }
}
