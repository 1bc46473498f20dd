//! Sparse-blossom minimum-weight perfect matching decoder for quantum
//! error correction. Regions grow through a weighted detector graph in
//! continuous integer time; collisions drive an alternating-tree blossom
//! algorithm; the result is the XOR of observables along the matched
//! paths.

pub mod driver;
pub mod error;
pub mod events;
pub mod flood;
pub mod ints;
pub mod matcher;
pub mod pool;
pub mod queue;
pub mod radius;
pub mod search;

pub use driver::decode::Matching;
pub use error::{DemError, MatchingError};
