use crate::events::{Match, RegionEdge};
use crate::ints::{NodeId, RegionId, TreeNodeId};
use crate::pool::Pool;
use crate::queue::EventTracker;
use crate::radius::Radius;

/// A growing, frozen, or shrinking area of the graph: either a primal
/// region seeded by a single detection event, or a blossom contracted from
/// an odd cycle of regions.
///
/// A blossom is simply a region with non-empty `blossom_children`; growth
/// and shrink logic treat the two uniformly. Children are frozen while
/// contained and keep their own shells, so the nodes a region owns in
/// total are its shell plus its children's total areas.
#[derive(Debug, Clone)]
pub struct GraphFillRegion {
    pub blossom_parent: Option<RegionId>,
    pub alt_tree_node: Option<TreeNodeId>,
    pub radius: Radius,
    pub shrink_tracker: EventTracker,
    pub match_: Option<Match>,
    pub blossom_children: Vec<RegionEdge>,
    /// Nodes this region absorbed through its own growth, outermost last.
    pub shell_area: Vec<NodeId>,
}

impl Default for GraphFillRegion {
    fn default() -> Self {
        GraphFillRegion {
            blossom_parent: None,
            alt_tree_node: None,
            radius: Radius::frozen(0),
            shrink_tracker: EventTracker::default(),
            match_: None,
            blossom_children: Vec::new(),
            shell_area: Vec::new(),
        }
    }
}

impl GraphFillRegion {
    pub fn is_blossom(&self) -> bool {
        !self.blossom_children.is_empty()
    }
}

/// Collect every node owned by `region`, descending through nested blossom
/// children.
pub fn nodes_in_total_area(
    regions: &Pool<GraphFillRegion>,
    region: RegionId,
    out: &mut Vec<NodeId>,
) {
    out.extend_from_slice(&regions[region.0].shell_area);
    for child in &regions[region.0].blossom_children {
        nodes_in_total_area(regions, child.region, out);
    }
}
