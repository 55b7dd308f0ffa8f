// Thin re-export module: implementation is in `blockchain/core.rs` so block
// structure and validation stay in separate files.

pub mod core;
pub use core::*;
