use crate::ints::{NodeId, ObsMask, RegionId, Time, Weight};
use crate::queue::EventTracker;
use crate::radius::Radius;

use super::region::GraphFillRegion;

/// One vertex of the matching graph plus its per-decode flooding state.
///
/// Adjacency is parallel arrays; the boundary edge, when present, is at
/// index 0. Everything below the adjacency block is reset between decodes
/// (lazily, for touched nodes only).
#[derive(Debug, Clone, Default)]
pub struct DetectorNode {
    pub neighbors: Vec<NodeId>,
    pub neighbor_weights: Vec<Weight>,
    pub neighbor_observables: Vec<ObsMask>,

    /// Innermost region that flooded this node, and the top of that
    /// region's blossom ancestry (the region that actually grows).
    pub region_that_arrived: Option<RegionId>,
    pub region_that_arrived_top: Option<RegionId>,
    pub reached_from_source: Option<NodeId>,
    pub obs_crossed_from_source: ObsMask,
    /// Radius of the arriving top region at the moment this node was
    /// absorbed.
    pub arrival_radius: Time,
    /// Cached offset such that `top.radius + wrapped` is the fill depth
    /// past this node.
    pub wrapped_radius_cached: i32,
    pub event_tracker: EventTracker,
}

impl DetectorNode {
    /// Fill depth past this node as a function of time.
    pub fn local_radius(&self, regions: &[GraphFillRegion]) -> Radius {
        match self.region_that_arrived_top {
            None => Radius::frozen(0),
            Some(top) => regions[top.0 as usize].radius + self.wrapped_radius_cached as Time,
        }
    }

    /// Recompute the wrapped radius by walking the blossom ancestry from
    /// the arrival region up to (excluding) the top.
    pub fn compute_wrapped_radius(&self, regions: &[GraphFillRegion]) -> i32 {
        if self.reached_from_source.is_none() {
            return 0;
        }
        let mut total: i32 = 0;
        let mut region = self.region_that_arrived;
        while region != self.region_that_arrived_top {
            match region {
                Some(idx) => {
                    total += regions[idx.0 as usize].radius.base() as i32;
                    region = regions[idx.0 as usize].blossom_parent;
                }
                None => break,
            }
        }
        total - self.arrival_radius as i32
    }

    /// The region that inherits this node when its top blossom shatters:
    /// the entry of the ancestry chain directly below the top.
    pub fn heir_region_on_shatter(&self, regions: &[GraphFillRegion]) -> Option<RegionId> {
        let mut region = self.region_that_arrived?;
        loop {
            let parent = regions[region.0 as usize].blossom_parent;
            if parent == self.region_that_arrived_top {
                return Some(region);
            }
            region = parent?;
        }
    }

    pub fn has_same_owner_as(&self, other: &DetectorNode) -> bool {
        self.region_that_arrived_top.is_some()
            && self.region_that_arrived_top == other.region_that_arrived_top
    }

    /// Clear the per-decode state, keeping the adjacency.
    pub fn reset(&mut self) {
        self.region_that_arrived = None;
        self.region_that_arrived_top = None;
        self.reached_from_source = None;
        self.obs_crossed_from_source = 0;
        self.arrival_radius = 0;
        self.wrapped_radius_cached = 0;
        self.event_tracker.clear();
    }
}
