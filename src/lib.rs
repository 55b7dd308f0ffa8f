//! PowChain - an append-only, hash-linked block chain sealed by proof-of-work
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`blockchain`] - Block structure, the chain and full-chain validation
//! - [`crypto`] - SHA-256 hashing
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work mining
//!
//! ## Service
//! - [`service`] - Facade owning the chain, the miner and identifier assignment
//! - [`node`] - Process orchestration
//!
//! ## Integration
//! - [`api`] - REST API (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod crypto;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Service
// ============================================================================
pub mod node;
pub mod service;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
