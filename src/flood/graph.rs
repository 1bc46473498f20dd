use std::collections::HashSet;

use crate::error::MatchingError;
use crate::ints::{NodeId, ObsMask, SignedWeight, TotalWeight};

use super::node::DetectorNode;

/// Sentinel `NodeId` marking a boundary neighbor.
pub const BOUNDARY_NODE: NodeId = NodeId(u32::MAX);

/// The static decode-time graph: integer weights, observable masks, and
/// the bookkeeping needed to undo negative-weight preprocessing.
///
/// Negative input weights are stored as their absolute value; the incident
/// detection events and observables are toggled in the negative-weight sets
/// so the driver can flip them before and after each decode.
#[derive(Debug)]
pub struct MatchingGraph {
    pub nodes: Vec<DetectorNode>,
    pub num_observables: usize,
    pub negative_weight_detection_events: HashSet<usize>,
    pub negative_weight_observables: HashSet<usize>,
    pub negative_weight_sum: TotalWeight,
    /// Nodes the builder declared as boundary nodes; detection events on
    /// them are dropped before decoding. Empty when none were declared.
    pub declared_boundary: Vec<bool>,
    pub normalising_constant: f64,
}

impl MatchingGraph {
    pub fn new(num_nodes: usize, num_observables: usize) -> Self {
        MatchingGraph {
            nodes: (0..num_nodes).map(|_| DetectorNode::default()).collect(),
            num_observables,
            negative_weight_detection_events: HashSet::new(),
            negative_weight_observables: HashSet::new(),
            negative_weight_sum: 0,
            declared_boundary: Vec::new(),
            normalising_constant: 1.0,
        }
    }

    fn check_node(&self, node: usize) -> Result<(), MatchingError> {
        if node >= self.nodes.len() {
            return Err(MatchingError::InvalidNodeIndex {
                node,
                num_nodes: self.nodes.len(),
            });
        }
        Ok(())
    }

    fn toggle_observables(&mut self, observables: &[usize]) {
        for &obs in observables {
            if !self.negative_weight_observables.remove(&obs) {
                self.negative_weight_observables.insert(obs);
            }
        }
    }

    fn toggle_detection_event(&mut self, node: usize) {
        if !self.negative_weight_detection_events.remove(&node) {
            self.negative_weight_detection_events.insert(node);
        }
    }

    fn obs_mask(observables: &[usize]) -> ObsMask {
        let mut mask: ObsMask = 0;
        for &obs in observables {
            debug_assert!(obs < 64, "observable index exceeds mask width");
            mask ^= 1u64 << obs;
        }
        mask
    }

    /// Add an undirected edge between `u` and `v`. Self-loops are ignored
    /// after their negative-weight bookkeeping (which cancels out anyway).
    pub fn add_edge(
        &mut self,
        u: usize,
        v: usize,
        weight: SignedWeight,
        observables: &[usize],
    ) -> Result<(), MatchingError> {
        self.check_node(u)?;
        self.check_node(v)?;

        if weight < 0 {
            self.toggle_observables(observables);
            self.toggle_detection_event(u);
            self.toggle_detection_event(v);
            self.negative_weight_sum += weight as TotalWeight;
        }
        if u == v {
            return Ok(());
        }

        let abs_weight = weight.unsigned_abs();
        let mask = Self::obs_mask(observables);

        self.nodes[u].neighbors.push(NodeId(v as u32));
        self.nodes[u].neighbor_weights.push(abs_weight);
        self.nodes[u].neighbor_observables.push(mask);

        self.nodes[v].neighbors.push(NodeId(u as u32));
        self.nodes[v].neighbor_weights.push(abs_weight);
        self.nodes[v].neighbor_observables.push(mask);
        Ok(())
    }

    /// Add an edge from `u` to the virtual boundary. The boundary edge
    /// always sits at neighbor index 0 and there is at most one per node;
    /// when one already exists the lighter of the two survives.
    pub fn add_boundary_edge(
        &mut self,
        u: usize,
        weight: SignedWeight,
        observables: &[usize],
    ) -> Result<(), MatchingError> {
        self.check_node(u)?;

        if weight < 0 {
            self.toggle_observables(observables);
            self.toggle_detection_event(u);
            self.negative_weight_sum += weight as TotalWeight;
        }

        let abs_weight = weight.unsigned_abs();
        let mask = Self::obs_mask(observables);
        let node = &mut self.nodes[u];

        if node.neighbors.first() == Some(&BOUNDARY_NODE) {
            if abs_weight < node.neighbor_weights[0] {
                node.neighbor_weights[0] = abs_weight;
                node.neighbor_observables[0] = mask;
            }
        } else {
            node.neighbors.insert(0, BOUNDARY_NODE);
            node.neighbor_weights.insert(0, abs_weight);
            node.neighbor_observables.insert(0, mask);
        }
        Ok(())
    }

    /// XOR mask of observables on negative-weight edges, applied to every
    /// decode result.
    pub fn negative_weight_obs_mask(&self) -> ObsMask {
        let mut mask: ObsMask = 0;
        for &obs in &self.negative_weight_observables {
            mask ^= 1u64 << obs;
        }
        mask
    }
}
