// core.rs splits block/chain structure from chain-wide validation.
pub mod chain;
pub mod validation;

pub use chain::*;
pub use validation::*;
