//! Bidirectional Dijkstra over the search graph.
//!
//! After the blossom phase decides *which* terminals pair up, this flooder
//! recovers the actual shortest edge path between them, so callers can see
//! individual correction edges rather than just endpoints.

use std::num::Wrapping;

use crate::events::CompressedEdge;
use crate::ints::{CyclicTime, NodeId, ObsMask, SearchNodeId, Time};
use crate::queue::{QueuedEvent, RadixHeap};

use super::graph::SearchGraph;

#[derive(Debug, Clone, Copy)]
pub enum SearchEvent {
    Drained,
    CheckNode { node: SearchNodeId, time: CyclicTime },
}

impl QueuedEvent for SearchEvent {
    fn time(&self) -> CyclicTime {
        match self {
            SearchEvent::Drained => Wrapping(0),
            SearchEvent::CheckNode { time, .. } => *time,
        }
    }
    fn sentinel() -> Self {
        SearchEvent::Drained
    }
    fn is_sentinel(&self) -> bool {
        matches!(self, SearchEvent::Drained)
    }
}

/// The edge on which the two search fronts met.
#[derive(Debug, Clone, Copy)]
pub struct SearchCollision {
    pub node: Option<SearchNodeId>,
    pub neighbor_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchTarget {
    Node,
    Boundary,
    Unset,
}

pub struct SearchFlooder {
    pub graph: SearchGraph,
    pub queue: RadixHeap<SearchEvent>,
    reached: Vec<SearchNodeId>,
    target: SearchTarget,
}

impl SearchFlooder {
    pub fn new(graph: SearchGraph) -> Self {
        SearchFlooder {
            graph,
            queue: RadixHeap::new(),
            reached: Vec::new(),
            target: SearchTarget::Unset,
        }
    }

    fn find_next_event(&self, node_id: SearchNodeId) -> (Option<usize>, Time) {
        let node = &self.graph.nodes[node_id.0 as usize];
        let mut best_time = Time::MAX;
        let mut best: Option<usize> = None;

        let mut start = 0;
        if node.neighbors.first() == Some(&None) {
            if self.target == SearchTarget::Boundary {
                let weight = node.neighbor_weights[0] as Time;
                let covered = self.queue.cur_time - node.distance_from_source;
                let t = self.queue.cur_time + weight - covered;
                if t < best_time {
                    best_time = t;
                    best = Some(0);
                }
            }
            start = 1;
        }

        for i in start..node.neighbors.len() {
            let weight = node.neighbor_weights[i] as Time;
            let other_id = node.neighbors[i].expect("only index 0 can be the boundary");
            let other = &self.graph.nodes[other_id.0 as usize];

            let t = if other.reached_from_source == node.reached_from_source {
                continue;
            } else if other.reached_from_source.is_none() {
                let covered = self.queue.cur_time - node.distance_from_source;
                self.queue.cur_time + weight - covered
            } else {
                let covered_here = self.queue.cur_time - node.distance_from_source;
                let covered_there = self.queue.cur_time - other.distance_from_source;
                self.queue.cur_time + (weight - covered_here - covered_there) / 2
            };
            if t < best_time {
                best_time = t;
                best = Some(i);
            }
        }

        (best, best_time)
    }

    fn reschedule(&mut self, node_id: SearchNodeId) {
        let (best, best_time) = self.find_next_event(node_id);
        match best {
            None => self.graph.nodes[node_id.0 as usize].event_tracker.cancel(),
            Some(_) => {
                let event = SearchEvent::CheckNode {
                    node: node_id,
                    time: Wrapping(best_time as u32),
                };
                self.graph.nodes[node_id.0 as usize]
                    .event_tracker
                    .schedule(event, &mut self.queue);
            }
        }
    }

    fn start_front_at(&mut self, src: SearchNodeId) {
        {
            let node = &mut self.graph.nodes[src.0 as usize];
            node.reached_from_source = Some(src);
            node.predecessor_index = None;
            node.distance_from_source = 0;
        }
        self.reached.push(src);
        self.reschedule(src);
    }

    fn reach_node(&mut self, empty: SearchNodeId, empty_to_from: usize) {
        let from = self.graph.nodes[empty.0 as usize].neighbors[empty_to_from]
            .expect("reached over a real edge");
        let source = self.graph.nodes[from.0 as usize].reached_from_source;
        let distance = self.graph.nodes[from.0 as usize].distance_from_source
            + self.graph.nodes[empty.0 as usize].neighbor_weights[empty_to_from] as Time;
        {
            let node = &mut self.graph.nodes[empty.0 as usize];
            node.reached_from_source = source;
            node.predecessor_index = Some(empty_to_from);
            node.distance_from_source = distance;
        }
        self.reached.push(empty);
        self.reschedule(empty);
    }

    fn look_at_node(&mut self, node_id: SearchNodeId) -> Option<SearchCollision> {
        let (best, best_time) = self.find_next_event(node_id);
        let best = best?;

        if best_time != self.queue.cur_time {
            let event = SearchEvent::CheckNode {
                node: node_id,
                time: Wrapping(best_time as u32),
            };
            self.graph.nodes[node_id.0 as usize]
                .event_tracker
                .schedule(event, &mut self.queue);
            return None;
        }

        match self.graph.nodes[node_id.0 as usize].neighbors[best] {
            None => Some(SearchCollision {
                node: Some(node_id),
                neighbor_index: best,
            }),
            Some(other_id) => {
                if self.graph.nodes[other_id.0 as usize]
                    .reached_from_source
                    .is_none()
                {
                    let reverse = self.graph.nodes[other_id.0 as usize]
                        .index_of_neighbor(Some(node_id));
                    self.reach_node(other_id, reverse);
                    // Revisit for further edges at this same time.
                    let event = SearchEvent::CheckNode {
                        node: node_id,
                        time: Wrapping(self.queue.cur_time as u32),
                    };
                    self.graph.nodes[node_id.0 as usize]
                        .event_tracker
                        .schedule(event, &mut self.queue);
                    None
                } else {
                    Some(SearchCollision {
                        node: Some(node_id),
                        neighbor_index: best,
                    })
                }
            }
        }
    }

    /// Flood from `src` (and `dst` when it is a node) until the fronts
    /// meet. `dst == None` searches for the boundary.
    fn run_until_collision(
        &mut self,
        src: SearchNodeId,
        dst: Option<SearchNodeId>,
    ) -> Option<SearchCollision> {
        match dst {
            None => self.target = SearchTarget::Boundary,
            Some(d) => {
                self.target = SearchTarget::Node;
                self.start_front_at(d);
            }
        }
        self.start_front_at(src);

        loop {
            let event = self.queue.pop();
            let SearchEvent::CheckNode { node, .. } = event else {
                return None;
            };
            let live = self.graph.nodes[node.0 as usize].event_tracker.resolve(
                &event,
                &mut self.queue,
                |time| SearchEvent::CheckNode { node, time },
            );
            if live {
                if let Some(collision) = self.look_at_node(node) {
                    return Some(collision);
                }
            }
        }
    }

    fn trace_back(&self, start: SearchNodeId) -> Vec<SearchCollision> {
        let mut edges = Vec::new();
        let mut cur = start;
        while let Some(pred) = self.graph.nodes[cur.0 as usize].predecessor_index {
            edges.push(SearchCollision {
                node: Some(cur),
                neighbor_index: pred,
            });
            cur = self.graph.nodes[cur.0 as usize].neighbors[pred]
                .expect("predecessors are real nodes");
        }
        edges
    }

    /// Visit the edges of the shortest path from `src` to `dst` in order,
    /// as `(from, to, obs_mask)` with `None` standing for the boundary.
    pub fn iter_edges_on_shortest_path(
        &mut self,
        src: usize,
        dst: Option<usize>,
        mut visit: impl FnMut(Option<SearchNodeId>, Option<SearchNodeId>, ObsMask),
    ) {
        let src_id = SearchNodeId(src as u32);
        let dst_id = dst.map(|d| SearchNodeId(d as u32));

        let collision = match self.run_until_collision(src_id, dst_id) {
            Some(c) => c,
            None => {
                self.reset();
                return;
            }
        };
        let collision_node = collision.node.expect("collision carries its node");

        let path_a = self.trace_back(collision_node);
        let mut path_b = vec![collision];
        if let Some(other) =
            self.graph.nodes[collision_node.0 as usize].neighbors[collision.neighbor_index]
        {
            path_b.extend(self.trace_back(other));
        }

        // One of the two traces ends at src; emit that one reversed first.
        let last_b = {
            let last = path_b.last().expect("path_b starts non-empty");
            self.graph.nodes[last.node.expect("trace nodes are real").0 as usize].neighbors
                [last.neighbor_index]
        };
        if last_b == Some(src_id) {
            self.emit_reversed(&path_b, &mut visit);
            self.emit_forward(&path_a, &mut visit);
        } else {
            self.emit_reversed(&path_a, &mut visit);
            self.emit_forward(&path_b, &mut visit);
        }

        self.reset();
    }

    fn emit_forward(
        &self,
        edges: &[SearchCollision],
        visit: &mut impl FnMut(Option<SearchNodeId>, Option<SearchNodeId>, ObsMask),
    ) {
        for e in edges {
            let node = e.node.expect("trace nodes are real");
            let i = node.0 as usize;
            visit(
                e.node,
                self.graph.nodes[i].neighbors[e.neighbor_index],
                self.graph.nodes[i].neighbor_observables[e.neighbor_index],
            );
        }
    }

    fn emit_reversed(
        &self,
        edges: &[SearchCollision],
        visit: &mut impl FnMut(Option<SearchNodeId>, Option<SearchNodeId>, ObsMask),
    ) {
        for e in edges.iter().rev() {
            let node = e.node.expect("trace nodes are real");
            let i = node.0 as usize;
            let other = self.graph.nodes[i].neighbors[e.neighbor_index];
            visit(
                other,
                e.node,
                self.graph.nodes[i].neighbor_observables[e.neighbor_index],
            );
        }
    }

    /// Compress the shortest path between two detectors (or a detector and
    /// the boundary) into a single edge.
    pub fn shortest_path_edge(&mut self, src: usize, dst: Option<usize>) -> CompressedEdge {
        let mut obs_mask: ObsMask = 0;
        self.iter_edges_on_shortest_path(src, dst, |_, _, obs| {
            obs_mask ^= obs;
        });
        CompressedEdge {
            loc_from: Some(NodeId(src as u32)),
            loc_to: dst.map(|d| NodeId(d as u32)),
            obs_mask,
        }
    }

    /// Clear only what the last search touched.
    pub fn reset(&mut self) {
        for &idx in &self.reached {
            self.graph.nodes[idx.0 as usize].reset();
        }
        self.reached.clear();
        self.queue.reset();
        self.target = SearchTarget::Unset;
    }
}
