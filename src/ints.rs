use std::num::Wrapping;

/// Index into `MatchingGraph::nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Index into the region pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub u32);

/// Index into the alternating-tree pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeNodeId(pub u32);

/// Index into `SearchGraph::nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchNodeId(pub u32);

/// Fixed-width observable bitmask.
pub type ObsMask = u64;
/// Discretized edge weight, non-negative after sign absorption.
pub type Weight = u32;
/// Discretized edge weight before the sign is absorbed.
pub type SignedWeight = i32;
/// Absolute simulation time; also accumulated radius, which is measured in
/// the same units.
pub type Time = i64;
/// Total matching weight.
pub type TotalWeight = i64;
/// Cyclic timestamp used by the radix queue.
pub type CyclicTime = Wrapping<u32>;

/// Neighbor-index sentinel for "no candidate edge".
pub const NO_NEIGHBOR: usize = usize::MAX;
