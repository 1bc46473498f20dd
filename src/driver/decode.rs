//! Public decoder entry point.
//!
//! A `Matching` owns the float-weight builder plus lazily compiled solver
//! state. Each decode seeds the flooder with detection events, drains the
//! event loop through the matching manager, extracts the finalized match
//! edges, and undoes the negative-weight preprocessing. Reset between
//! decodes is lazy: only nodes that were actually flooded are touched.

use crate::error::MatchingError;
use crate::events::CompressedEdge;
use crate::flood::graph::MatchingGraph;
use crate::ints::NodeId;
use crate::matcher::mwpm::{MatchingResult, Mwpm};
use crate::search::flooder::SearchFlooder;

use super::dem::parse_dem;
use super::weighted::WeightedGraph;

pub struct Matching {
    graph: WeightedGraph,
    mwpm: Option<Mwpm>,
    search: Option<SearchFlooder>,
}

impl Matching {
    pub fn new() -> Self {
        Matching {
            graph: WeightedGraph::new(),
            mwpm: None,
            search: None,
        }
    }

    /// Build from detector-error-model text.
    pub fn from_dem(text: &str) -> Result<Self, MatchingError> {
        let graph = parse_dem(text)?;
        Ok(Matching {
            graph,
            mwpm: None,
            search: None,
        })
    }

    /// Add an edge, merging with any existing parallel edge.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64, observables: &[usize]) {
        self.graph.add_or_merge_edge(u, v, weight, observables);
        self.invalidate();
    }

    /// Add or merge the boundary edge of `u`.
    pub fn add_boundary_edge(&mut self, u: usize, weight: f64, observables: &[usize]) {
        self.graph.add_or_merge_boundary_edge(u, weight, observables);
        self.invalidate();
    }

    /// Declare real nodes as boundary nodes.
    pub fn set_boundary(&mut self, nodes: &[usize]) {
        self.graph.set_boundary(nodes.iter().copied().collect());
        self.invalidate();
    }

    pub fn num_observables(&self) -> usize {
        self.graph.num_observables
    }

    pub fn num_detectors(&self) -> usize {
        self.graph.num_detectors()
    }

    fn invalidate(&mut self) {
        self.mwpm = None;
        self.search = None;
    }

    fn ensure_solver(&mut self) -> Result<&mut Mwpm, MatchingError> {
        if self.graph.num_edges() == 0 {
            return Err(MatchingError::GraphNotInitialized);
        }
        if self.mwpm.is_none() {
            self.mwpm = Some(self.graph.to_mwpm()?);
        }
        Ok(self.mwpm.as_mut().expect("solver was just built"))
    }

    /// Decode a one-byte-per-detector syndrome into one byte per
    /// observable.
    pub fn decode(&mut self, syndrome: &[u8]) -> Result<Vec<u8>, MatchingError> {
        let events = detection_events_from_syndrome(syndrome);
        let result = self.decode_detection_events(&events)?;
        let num_observables = self.graph.num_observables;
        Ok((0..num_observables)
            .map(|i| ((result.obs_mask >> i) & 1) as u8)
            .collect())
    }

    /// Decode a set of flagged detector ids into an observable mask and
    /// total matching weight.
    pub fn decode_detection_events(
        &mut self,
        detection_events: &[usize],
    ) -> Result<MatchingResult, MatchingError> {
        let mwpm = self.ensure_solver()?;
        let events = effective_detection_events(detection_events, &mwpm.flooder.graph)?;
        if let Err(e) = run_to_completion(mwpm, &events) {
            mwpm.reset();
            return Err(e);
        }
        let mut result = extract_matching(mwpm, &events);
        result.obs_mask ^= mwpm.flooder.graph.negative_weight_obs_mask();
        result.weight += mwpm.flooder.graph.negative_weight_sum;
        lazy_cleanup(mwpm);
        Ok(result)
    }

    /// Matched detector pairs for a syndrome, boundary as `-1`.
    pub fn decode_to_matched_pairs(
        &mut self,
        syndrome: &[u8],
    ) -> Result<Vec<(i64, i64)>, MatchingError> {
        let edges = self.finalized_match_edges(syndrome)?;
        Ok(edges
            .iter()
            .map(|e| {
                (
                    e.loc_from.map_or(-1, |n| n.0 as i64),
                    e.loc_to.map_or(-1, |n| n.0 as i64),
                )
            })
            .collect())
    }

    /// The individual graph edges of the correction: each matched pair's
    /// shortest path, traced through the search graph. Boundary as `-1`.
    pub fn decode_to_edges(&mut self, syndrome: &[u8]) -> Result<Vec<(i64, i64)>, MatchingError> {
        let matches = self.finalized_match_edges(syndrome)?;
        if self.search.is_none() {
            self.search = Some(self.graph.to_search_flooder());
        }
        let search = self.search.as_mut().expect("search flooder was just built");

        let mut edges = Vec::new();
        for m in &matches {
            let src = m.loc_from.expect("match edges start at a detector").0 as usize;
            let dst = m.loc_to.map(|n| n.0 as usize);
            search.iter_edges_on_shortest_path(src, dst, |from, to, _| {
                edges.push((
                    from.map_or(-1, |n| n.0 as i64),
                    to.map_or(-1, |n| n.0 as i64),
                ));
            });
        }
        Ok(edges)
    }

    /// Decode many syndromes; each row matches what `decode` returns.
    pub fn decode_batch(&mut self, syndromes: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, MatchingError> {
        syndromes.iter().map(|s| self.decode(s)).collect()
    }

    fn finalized_match_edges(
        &mut self,
        syndrome: &[u8],
    ) -> Result<Vec<CompressedEdge>, MatchingError> {
        let detection_events = detection_events_from_syndrome(syndrome);
        let mwpm = self.ensure_solver()?;
        let events = effective_detection_events(&detection_events, &mwpm.flooder.graph)?;
        if let Err(e) = run_to_completion(mwpm, &events) {
            mwpm.reset();
            return Err(e);
        }
        extract_matching(mwpm, &events);
        let edges = std::mem::take(&mut mwpm.flooder.match_edges);
        lazy_cleanup(mwpm);
        Ok(edges)
    }
}

impl Default for Matching {
    fn default() -> Self {
        Self::new()
    }
}

// --- pipeline steps --------------------------------------------------------

fn detection_events_from_syndrome(syndrome: &[u8]) -> Vec<usize> {
    syndrome
        .iter()
        .enumerate()
        .filter(|(_, &v)| v != 0)
        .map(|(i, _)| i)
        .collect()
}

/// Validate the flagged detectors, fold in the negative-weight event flips,
/// and drop declared boundary nodes.
fn effective_detection_events(
    detection_events: &[usize],
    graph: &MatchingGraph,
) -> Result<Vec<usize>, MatchingError> {
    let num_nodes = graph.nodes.len();
    for &d in detection_events {
        if d >= num_nodes {
            return Err(MatchingError::InvalidNodeIndex {
                node: d,
                num_nodes,
            });
        }
    }

    let is_declared_boundary =
        |d: usize| d < graph.declared_boundary.len() && graph.declared_boundary[d];

    if graph.negative_weight_detection_events.is_empty() {
        return Ok(detection_events
            .iter()
            .copied()
            .filter(|&d| !is_declared_boundary(d))
            .collect());
    }

    let mut active: std::collections::HashSet<usize> =
        detection_events.iter().copied().collect();
    for &d in &graph.negative_weight_detection_events {
        if !active.remove(&d) {
            active.insert(d);
        }
    }
    let mut events: Vec<usize> = active
        .into_iter()
        .filter(|&d| !is_declared_boundary(d))
        .collect();
    events.sort_unstable();
    Ok(events)
}

/// Seed the flooder and drain the event loop. Fails when the queue dries
/// up with an unmatched region left over.
fn run_to_completion(mwpm: &mut Mwpm, detection_events: &[usize]) -> Result<(), MatchingError> {
    for &d in detection_events {
        mwpm.create_detection_event(NodeId(d as u32));
    }
    loop {
        let event = mwpm.next_mwpm_event();
        if event.is_no_event() {
            break;
        }
        mwpm.process_event(event);
    }
    for &d in detection_events {
        let top = mwpm.flooder.graph.nodes[d]
            .region_that_arrived_top
            .expect("seeded node stays flooded");
        if mwpm.flooder.regions[top.0].match_.is_none() {
            return Err(MatchingError::NoPerfectMatching);
        }
    }
    Ok(())
}

/// Walk the matched components, shattering blossoms and accumulating the
/// result. Every flooded node belongs to some component's total area, so
/// resetting the collected nodes restores the graph in O(touched).
fn extract_matching(mwpm: &mut Mwpm, detection_events: &[usize]) -> MatchingResult {
    let mut result = MatchingResult::default();
    for &d in detection_events {
        if mwpm.flooder.graph.nodes[d].region_that_arrived.is_none() {
            continue; // already handled as this component's partner
        }
        let top = mwpm.flooder.graph.nodes[d]
            .region_that_arrived_top
            .expect("flooded node has a top region");
        let touched = mwpm.collect_component_nodes(top);
        result += mwpm.shatter_blossom_and_extract_matches(top);
        for node in touched {
            mwpm.flooder.graph.nodes[node.0 as usize].reset();
        }
    }
    result
}

/// Drop per-decode pool and queue state without walking the node array.
fn lazy_cleanup(mwpm: &mut Mwpm) {
    mwpm.flooder.regions.clear();
    mwpm.tree.clear();
    mwpm.flooder.queue.reset();
    mwpm.flooder.match_edges.clear();
}
