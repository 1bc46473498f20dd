//! Continuous-time region growth.
//!
//! The flooder advances integer time through a radix heap of tentative
//! per-node and per-region check events. Node checks either absorb an
//! empty neighbor (no event escapes), or surface a collision between two
//! regions or a region and the boundary. Shrink checks peel nodes off a
//! retracting region's shell and, once nothing is left to peel, turn into
//! the two implosion events the matching manager consumes.

use std::num::Wrapping;

use crate::events::{CompressedEdge, FloodCheckEvent, MwpmEvent, RegionEdge};
use crate::ints::{NodeId, RegionId, Time, NO_NEIGHBOR};
use crate::matcher::tree::TreeNode;
use crate::pool::Pool;
use crate::queue::RadixHeap;
use crate::radius::Radius;

use super::graph::{MatchingGraph, BOUNDARY_NODE};
use super::node::DetectorNode;
use super::region::{nodes_in_total_area, GraphFillRegion};

#[derive(Debug)]
pub struct GraphFlooder {
    pub graph: MatchingGraph,
    pub regions: Pool<GraphFillRegion>,
    pub queue: RadixHeap<FloodCheckEvent>,
    /// Finalized match edges, filled in during extraction.
    pub match_edges: Vec<CompressedEdge>,
}

impl GraphFlooder {
    pub fn new(graph: MatchingGraph) -> Self {
        GraphFlooder {
            graph,
            regions: Pool::new(),
            queue: RadixHeap::new(),
            match_edges: Vec::new(),
        }
    }

    /// Seed a new region of radius zero at `node` and start it growing.
    pub fn create_region(&mut self, node: NodeId) -> RegionId {
        let region = RegionId(self.regions.alloc());
        {
            let r = &mut self.regions[region.0];
            r.radius = Radius::growing_from_zero_at(self.queue.cur_time);
            r.shell_area.push(node);
        }

        let n = &mut self.graph.nodes[node.0 as usize];
        debug_assert!(
            n.region_that_arrived.is_none(),
            "detection event created on an already flooded node"
        );
        n.region_that_arrived = Some(region);
        n.region_that_arrived_top = Some(region);
        n.reached_from_source = Some(node);
        n.obs_crossed_from_source = 0;
        n.arrival_radius = 0;
        n.wrapped_radius_cached = 0;

        self.reschedule_events_at_node(node);
        region
    }

    /// Advance time until something the matching manager cares about
    /// happens, or the queue drains.
    pub fn next_event(&mut self, tree: &Pool<TreeNode>) -> MwpmEvent {
        loop {
            let event = self.pop_valid();
            let notification = match event {
                FloodCheckEvent::Drained => return MwpmEvent::NoEvent,
                FloodCheckEvent::CheckNode { node, .. } => self.look_at_node(node),
                FloodCheckEvent::CheckRegionShrink { region, .. } => {
                    self.shrink_region_step(region, tree)
                }
            };
            if !notification.is_no_event() {
                return notification;
            }
        }
    }

    /// Pop until a live event surfaces, discarding stale ones.
    fn pop_valid(&mut self) -> FloodCheckEvent {
        loop {
            let event = self.queue.pop();
            let live = match event {
                FloodCheckEvent::Drained => return event,
                FloodCheckEvent::CheckNode { node, .. } => self.graph.nodes[node.0 as usize]
                    .event_tracker
                    .resolve(&event, &mut self.queue, |time| FloodCheckEvent::CheckNode {
                        node,
                        time,
                    }),
                FloodCheckEvent::CheckRegionShrink { region, .. } => self.regions[region.0]
                    .shrink_tracker
                    .resolve(&event, &mut self.queue, |time| {
                        FloodCheckEvent::CheckRegionShrink { region, time }
                    }),
            };
            if live {
                return event;
            }
        }
    }

    // --- node checks -------------------------------------------------------

    fn look_at_node(&mut self, node: NodeId) -> MwpmEvent {
        let (best_neighbor, best_time) = self.next_event_at_node(node);

        if best_neighbor != NO_NEIGHBOR && best_time == self.queue.cur_time {
            // The interaction is happening now. Re-arm the tracker first so
            // the node is revisited for any further simultaneous edges.
            let check = FloodCheckEvent::CheckNode {
                node,
                time: Wrapping(self.queue.cur_time as u32),
            };
            self.graph.nodes[node.0 as usize]
                .event_tracker
                .schedule(check, &mut self.queue);

            let neighbor = self.graph.nodes[node.0 as usize].neighbors[best_neighbor];
            if neighbor == BOUNDARY_NODE {
                return self.region_hit_boundary(node, best_neighbor);
            }
            return self.neighbor_interaction(node, best_neighbor, neighbor);
        }

        if best_neighbor != NO_NEIGHBOR {
            let check = FloodCheckEvent::CheckNode {
                node,
                time: Wrapping(best_time as u32),
            };
            self.graph.nodes[node.0 as usize]
                .event_tracker
                .schedule(check, &mut self.queue);
        }
        MwpmEvent::NoEvent
    }

    fn region_hit_boundary(&self, node: NodeId, boundary_index: usize) -> MwpmEvent {
        let n = &self.graph.nodes[node.0 as usize];
        MwpmEvent::RegionHitBoundary {
            region: n
                .region_that_arrived_top
                .expect("boundary hit from an unflooded node"),
            edge: CompressedEdge {
                loc_from: n.reached_from_source,
                loc_to: None,
                obs_mask: n.obs_crossed_from_source ^ n.neighbor_observables[boundary_index],
            },
        }
    }

    fn neighbor_interaction(
        &mut self,
        src: NodeId,
        src_to_dst: usize,
        dst: NodeId,
    ) -> MwpmEvent {
        let src_flooded = self.graph.nodes[src.0 as usize].region_that_arrived.is_some();
        let dst_flooded = self.graph.nodes[dst.0 as usize].region_that_arrived.is_some();

        if src_flooded && !dst_flooded {
            self.absorb_empty_node(dst, src, src_to_dst);
            return MwpmEvent::NoEvent;
        }
        if dst_flooded && !src_flooded {
            let dst_to_src = self.index_of_neighbor(dst, src);
            self.absorb_empty_node(src, dst, dst_to_src);
            return MwpmEvent::NoEvent;
        }

        debug_assert!(src_flooded && dst_flooded);
        let sn = &self.graph.nodes[src.0 as usize];
        let dn = &self.graph.nodes[dst.0 as usize];
        debug_assert!(
            !sn.has_same_owner_as(dn),
            "same-region interaction reached the dispatcher"
        );
        MwpmEvent::RegionHitRegion {
            region1: sn.region_that_arrived_top.expect("flooded node has a region"),
            region2: dn.region_that_arrived_top.expect("flooded node has a region"),
            edge: CompressedEdge {
                loc_from: sn.reached_from_source,
                loc_to: dn.reached_from_source,
                obs_mask: sn.obs_crossed_from_source
                    ^ dn.obs_crossed_from_source
                    ^ sn.neighbor_observables[src_to_dst],
            },
        }
    }

    /// Absorb an unflooded node into the region arriving over the given
    /// edge. Emits nothing; the flooding just advances.
    fn absorb_empty_node(&mut self, empty: NodeId, from: NodeId, from_to_empty: usize) {
        let (obs, source, top) = {
            let f = &self.graph.nodes[from.0 as usize];
            (
                f.obs_crossed_from_source ^ f.neighbor_observables[from_to_empty],
                f.reached_from_source,
                f.region_that_arrived_top,
            )
        };
        let arrival = match top {
            Some(t) => self.regions[t.0].radius.at(self.queue.cur_time),
            None => 0,
        };
        debug_assert!(arrival >= 0, "region radius went negative");

        {
            let n = &mut self.graph.nodes[empty.0 as usize];
            n.obs_crossed_from_source = obs;
            n.reached_from_source = source;
            n.arrival_radius = arrival;
            // The node was reached by the top region's own growth, so the
            // top is also its innermost owner.
            n.region_that_arrived = top;
            n.region_that_arrived_top = top;
            n.wrapped_radius_cached = -(arrival as i32);
        }
        if let Some(t) = top {
            self.regions[t.0].shell_area.push(empty);
        }
        self.reschedule_events_at_node(empty);
    }

    // --- collision timing --------------------------------------------------

    fn next_event_at_node(&self, node: NodeId) -> (usize, Time) {
        let n = &self.graph.nodes[node.0 as usize];
        let rad1 = n.local_radius(self.regions.slots());
        if rad1.is_growing() {
            self.next_event_growing(n, rad1)
        } else {
            self.next_event_not_growing(n, rad1)
        }
    }

    /// The node's region is growing: candidate events are the boundary,
    /// unflooded neighbors, and neighbors whose local radius is closing the
    /// gap with ours. Collision timing is the zero crossing of the edge's
    /// remaining weight, `rad1 - weight` summed with the far side.
    fn next_event_growing(&self, node: &DetectorNode, rad1: Radius) -> (usize, Time) {
        let mut best_time = Time::MAX;
        let mut best_neighbor = NO_NEIGHBOR;

        for i in 0..node.neighbors.len() {
            let neighbor = node.neighbors[i];
            let weight = node.neighbor_weights[i] as Time;

            if neighbor == BOUNDARY_NODE {
                let t = (rad1 - weight).zero_time();
                if t < best_time {
                    best_time = t;
                    best_neighbor = i;
                }
                continue;
            }

            let other = &self.graph.nodes[neighbor.0 as usize];
            if node.has_same_owner_as(other) {
                continue;
            }
            let rad2 = other.local_radius(self.regions.slots());
            if !rad1.approaching(rad2) {
                continue;
            }

            let t = (rad1 - weight).sum_zero_time(rad2);
            if t < best_time {
                best_time = t;
                best_neighbor = i;
            }
        }

        (best_neighbor, best_time)
    }

    /// The node is unflooded or its region is not growing: only growing
    /// neighbors can reach it. The boundary never initiates anything.
    fn next_event_not_growing(&self, node: &DetectorNode, rad1: Radius) -> (usize, Time) {
        let mut best_time = Time::MAX;
        let mut best_neighbor = NO_NEIGHBOR;

        let start = usize::from(node.neighbors.first() == Some(&BOUNDARY_NODE));
        for i in start..node.neighbors.len() {
            let weight = node.neighbor_weights[i] as Time;
            let other = &self.graph.nodes[node.neighbors[i].0 as usize];
            let rad2 = other.local_radius(self.regions.slots());
            if !rad1.approaching(rad2) {
                continue;
            }
            let t = (rad1 - weight).sum_zero_time(rad2);
            if t < best_time {
                best_time = t;
                best_neighbor = i;
            }
        }

        (best_neighbor, best_time)
    }

    /// Recompute and re-arm the node's next tentative event.
    pub fn reschedule_events_at_node(&mut self, node: NodeId) {
        let (best_neighbor, best_time) = self.next_event_at_node(node);
        if best_neighbor == NO_NEIGHBOR {
            self.graph.nodes[node.0 as usize].event_tracker.cancel();
        } else {
            let check = FloodCheckEvent::CheckNode {
                node,
                time: Wrapping(best_time as u32),
            };
            self.graph.nodes[node.0 as usize]
                .event_tracker
                .schedule(check, &mut self.queue);
        }
    }

    /// Reschedule every node in a region's total area.
    pub fn reschedule_region(&mut self, region: RegionId) {
        let mut nodes = Vec::new();
        nodes_in_total_area(&self.regions, region, &mut nodes);
        for node in nodes {
            self.reschedule_events_at_node(node);
        }
    }

    // --- growth-sign transitions -------------------------------------------

    pub fn set_region_growing(&mut self, region: RegionId) {
        let r = &mut self.regions[region.0];
        r.radius = r.radius.then_growing_at(self.queue.cur_time);
        r.shrink_tracker.cancel();
        self.reschedule_region(region);
    }

    pub fn set_region_frozen(&mut self, region: RegionId) {
        let was_shrinking = {
            let r = &mut self.regions[region.0];
            let was = r.radius.is_shrinking();
            r.radius = r.radius.then_frozen_at(self.queue.cur_time);
            r.shrink_tracker.cancel();
            was
        };
        // Freezing a grower leaves early events in the queue; they resolve
        // as spurious wakeups. A shrinker's nodes had no events at all.
        if was_shrinking {
            self.reschedule_region(region);
        }
    }

    pub fn set_region_shrinking(&mut self, region: RegionId) {
        {
            let r = &mut self.regions[region.0];
            r.radius = r.radius.then_shrinking_at(self.queue.cur_time);
        }
        self.schedule_shrink_check(region);
        // A retracting front never initiates collisions.
        let mut nodes = Vec::new();
        nodes_in_total_area(&self.regions, region, &mut nodes);
        for node in nodes {
            self.graph.nodes[node.0 as usize].event_tracker.cancel();
        }
    }

    fn schedule_shrink_check(&mut self, region: RegionId) {
        let time = {
            let r = &self.regions[region.0];
            if r.shell_area.is_empty() {
                r.radius.zero_time()
            } else {
                let last = *r.shell_area.last().expect("shell is non-empty");
                self.graph.nodes[last.0 as usize]
                    .local_radius(self.regions.slots())
                    .zero_time()
            }
        };
        let check = FloodCheckEvent::CheckRegionShrink {
            region,
            time: Wrapping(time as u32),
        };
        self.regions[region.0]
            .shrink_tracker
            .schedule(check, &mut self.queue);
    }

    // --- shrinking ---------------------------------------------------------

    fn shrink_region_step(&mut self, region: RegionId, tree: &Pool<TreeNode>) -> MwpmEvent {
        let (shell_len, is_blossom) = {
            let r = &self.regions[region.0];
            (r.shell_area.len(), r.is_blossom())
        };

        if shell_len == 0 {
            debug_assert!(is_blossom, "a bare region shrank past its own source");
            return self.blossom_implosion(region, tree);
        }
        if shell_len == 1 && !is_blossom {
            return self.degenerate_implosion(region, tree);
        }

        // Peel the outermost node off the shell.
        let leaving = self.regions[region.0]
            .shell_area
            .pop()
            .expect("shell is non-empty");
        self.graph.nodes[leaving.0 as usize].reset();
        self.reschedule_events_at_node(leaving);
        self.schedule_shrink_check(region);
        MwpmEvent::NoEvent
    }

    /// A primal region retracted to a point between its tree parent and its
    /// own outer partner. Reported as a collision of those two regions
    /// through the vanished one, which the manager resolves by fusing them
    /// into a blossom.
    fn degenerate_implosion(&self, region: RegionId, tree: &Pool<TreeNode>) -> MwpmEvent {
        let tn = self.regions[region.0]
            .alt_tree_node
            .expect("imploding region is not in a tree");
        let node = &tree[tn.0];
        debug_assert_eq!(node.inner_region, Some(region));
        let parent_link = node
            .parent
            .as_ref()
            .expect("imploding region has no tree parent");
        let parent_outer = tree[parent_link.node.0]
            .outer_region
            .expect("tree parent has no outer region");
        let own_outer = node
            .outer_region
            .expect("imploding region's tree slot has no outer region");
        // Fuse the two tree edges through the vanished region: parent outer
        // down into the inner region, then inner out to our own outer.
        let edge = parent_link
            .edge
            .reversed()
            .merged_with(&node.inner_to_outer_edge);
        MwpmEvent::RegionHitRegion {
            region1: parent_outer,
            region2: own_outer,
            edge,
        }
    }

    /// A blossom retracted to its children's outer boundary. The touched
    /// children are found by walking the anchor nodes of the two tree edges
    /// through the blossom ancestry.
    fn blossom_implosion(&self, region: RegionId, tree: &Pool<TreeNode>) -> MwpmEvent {
        let tn = self.regions[region.0]
            .alt_tree_node
            .expect("imploding blossom is not in a tree");
        let node = &tree[tn.0];
        debug_assert_eq!(node.inner_region, Some(region));
        let parent_anchor = node
            .parent
            .as_ref()
            .expect("imploding blossom has no tree parent")
            .edge
            .loc_from
            .expect("tree edge has no anchor node");
        let child_anchor = node
            .inner_to_outer_edge
            .loc_from
            .expect("inner-to-outer edge has no anchor node");

        let in_parent = self.graph.nodes[parent_anchor.0 as usize]
            .heir_region_on_shatter(self.regions.slots())
            .expect("parent anchor lies outside the blossom");
        let in_child = self.graph.nodes[child_anchor.0 as usize]
            .heir_region_on_shatter(self.regions.slots())
            .expect("child anchor lies outside the blossom");

        MwpmEvent::BlossomImplode {
            blossom: region,
            in_parent,
            in_child,
        }
    }

    // --- blossoms ----------------------------------------------------------

    /// Contract an odd cycle of regions into a new growing blossom. Each
    /// child freezes at its current radius and leaves the tree; every node
    /// in the cycle's total area is re-topped and rescheduled.
    pub fn create_blossom(&mut self, cycle: Vec<RegionEdge>) -> RegionId {
        debug_assert!(cycle.len() % 2 == 1, "blossom cycles have odd length");
        let blossom = RegionId(self.regions.alloc());
        {
            let b = &mut self.regions[blossom.0];
            b.radius = Radius::growing_from_zero_at(self.queue.cur_time);
            b.blossom_children = cycle;
        }

        let children: Vec<RegionId> = self.regions[blossom.0]
            .blossom_children
            .iter()
            .map(|c| c.region)
            .collect();
        for &child in &children {
            let c = &mut self.regions[child.0];
            c.radius = c.radius.then_frozen_at(self.queue.cur_time);
            c.alt_tree_node = None;
            c.blossom_parent = Some(blossom);
            c.shrink_tracker.cancel();
        }

        let mut nodes = Vec::new();
        for &child in &children {
            nodes_in_total_area(&self.regions, child, &mut nodes);
        }
        for &node in &nodes {
            self.graph.nodes[node.0 as usize].region_that_arrived_top = Some(blossom);
            let wrapped =
                self.graph.nodes[node.0 as usize].compute_wrapped_radius(self.regions.slots());
            self.graph.nodes[node.0 as usize].wrapped_radius_cached = wrapped;
        }
        for node in nodes {
            self.reschedule_events_at_node(node);
        }
        blossom
    }

    /// Undo a blossom's containment: children become their own tops again
    /// and their nodes are re-pointed at them. The blossom's children list
    /// is returned; the caller decides what re-enters the tree and frees
    /// the blossom slot.
    pub fn detach_blossom_children(&mut self, blossom: RegionId) -> Vec<RegionEdge> {
        let children = std::mem::take(&mut self.regions[blossom.0].blossom_children);
        for child in &children {
            self.regions[child.region.0].blossom_parent = None;
            let mut nodes = Vec::new();
            nodes_in_total_area(&self.regions, child.region, &mut nodes);
            for node in nodes {
                self.graph.nodes[node.0 as usize].region_that_arrived_top = Some(child.region);
                let wrapped = self.graph.nodes[node.0 as usize]
                    .compute_wrapped_radius(self.regions.slots());
                self.graph.nodes[node.0 as usize].wrapped_radius_cached = wrapped;
            }
        }
        children
    }

    // --- helpers -----------------------------------------------------------

    fn index_of_neighbor(&self, node: NodeId, target: NodeId) -> usize {
        self.graph.nodes[node.0 as usize]
            .neighbors
            .iter()
            .position(|n| *n == target)
            .expect("adjacency is symmetric")
    }

    /// Full reset: every node, the region pool, and the clock.
    pub fn reset(&mut self) {
        for node in &mut self.graph.nodes {
            node.reset();
        }
        self.regions.clear();
        self.queue.reset();
        self.match_edges.clear();
    }
}
