use crate::ints::{ObsMask, SearchNodeId, Time, Weight};
use crate::queue::EventTracker;

/// A node of the search graph used for shortest-path extraction between
/// matched terminals. Neighbors are `Option<SearchNodeId>`; `None` is the
/// boundary and always sits at index 0 when present.
#[derive(Debug, Clone, Default)]
pub struct SearchNode {
    pub neighbors: Vec<Option<SearchNodeId>>,
    pub neighbor_weights: Vec<Weight>,
    pub neighbor_observables: Vec<ObsMask>,

    pub reached_from_source: Option<SearchNodeId>,
    pub distance_from_source: Time,
    pub predecessor_index: Option<usize>,
    pub event_tracker: EventTracker,
}

impl SearchNode {
    pub fn index_of_neighbor(&self, target: Option<SearchNodeId>) -> usize {
        self.neighbors
            .iter()
            .position(|n| *n == target)
            .expect("adjacency is symmetric")
    }

    pub fn reset(&mut self) {
        self.reached_from_source = None;
        self.distance_from_source = 0;
        self.predecessor_index = None;
        self.event_tracker.clear();
    }
}

/// Weighted graph flooded with bidirectional Dijkstra to recover the exact
/// edge path behind a matched pair.
pub struct SearchGraph {
    pub nodes: Vec<SearchNode>,
    pub num_observables: usize,
}

impl SearchGraph {
    pub fn new(num_nodes: usize, num_observables: usize) -> Self {
        SearchGraph {
            nodes: (0..num_nodes).map(|_| SearchNode::default()).collect(),
            num_observables,
        }
    }

    pub fn add_edge(&mut self, u: usize, v: usize, weight: Weight, obs_mask: ObsMask) {
        if u == v {
            return;
        }
        self.nodes[u].neighbors.push(Some(SearchNodeId(v as u32)));
        self.nodes[u].neighbor_weights.push(weight);
        self.nodes[u].neighbor_observables.push(obs_mask);

        self.nodes[v].neighbors.push(Some(SearchNodeId(u as u32)));
        self.nodes[v].neighbor_weights.push(weight);
        self.nodes[v].neighbor_observables.push(obs_mask);
    }

    /// Boundary edges go to the front so the flooder can skip or target
    /// them by position.
    pub fn add_boundary_edge(&mut self, u: usize, weight: Weight, obs_mask: ObsMask) {
        self.nodes[u].neighbors.insert(0, None);
        self.nodes[u].neighbor_weights.insert(0, weight);
        self.nodes[u].neighbor_observables.insert(0, obs_mask);
    }
}
