//! The matching manager: consumes flooder events and maintains the
//! alternating-tree forest until every region is paired off, then walks
//! the pairing to extract observable masks and total weight.

use crate::events::{CompressedEdge, Match, MwpmEvent, RegionEdge};
use crate::flood::flooder::GraphFlooder;
use crate::flood::region::nodes_in_total_area;
use crate::ints::{NodeId, ObsMask, RegionId, TotalWeight, TreeNodeId};
use crate::pool::Pool;

use super::tree::{
    add_child, become_root, common_ancestor, detach_child, prune_upward_path, TreeLink, TreeNode,
};

/// Accumulated result of finalizing matches: XOR of crossed observables
/// and the summed weight of the matched paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchingResult {
    pub obs_mask: ObsMask,
    pub weight: TotalWeight,
}

impl std::ops::AddAssign for MatchingResult {
    fn add_assign(&mut self, rhs: Self) {
        self.obs_mask ^= rhs.obs_mask;
        self.weight += rhs.weight;
    }
}

#[derive(Debug)]
pub struct Mwpm {
    pub flooder: GraphFlooder,
    pub tree: Pool<TreeNode>,
}

impl Mwpm {
    pub fn new(flooder: GraphFlooder) -> Self {
        Mwpm {
            flooder,
            tree: Pool::new(),
        }
    }

    /// Seed a detection event: a fresh growing region rooted in its own
    /// one-node tree.
    pub fn create_detection_event(&mut self, node: NodeId) {
        let region = self.flooder.create_region(node);
        let tn = TreeNodeId(self.tree.alloc());
        self.tree[tn.0] = TreeNode::new_root(region);
        self.flooder.regions[region.0].alt_tree_node = Some(tn);
    }

    /// Pull the next MWPM event out of the flooder.
    pub fn next_mwpm_event(&mut self) -> MwpmEvent {
        self.flooder.next_event(&self.tree)
    }

    pub fn process_event(&mut self, event: MwpmEvent) {
        match event {
            MwpmEvent::RegionHitRegion {
                region1,
                region2,
                edge,
            } => self.handle_region_hit_region(region1, region2, edge),
            MwpmEvent::RegionHitBoundary { region, edge } => {
                self.handle_region_hit_boundary(region, edge)
            }
            MwpmEvent::BlossomImplode {
                blossom,
                in_parent,
                in_child,
            } => self.handle_blossom_implode(blossom, in_parent, in_child),
            MwpmEvent::NoEvent => {}
        }
    }

    // --- collision dispatch ------------------------------------------------

    fn handle_region_hit_region(
        &mut self,
        region1: RegionId,
        region2: RegionId,
        edge: CompressedEdge,
    ) {
        let tn1 = self.flooder.regions[region1.0].alt_tree_node;
        let tn2 = self.flooder.regions[region2.0].alt_tree_node;

        match (tn1, tn2) {
            (Some(a), Some(b)) => match common_ancestor(&mut self.tree, a, b) {
                Some(ancestor) => {
                    self.handle_same_tree_collision(region1, region2, edge, ancestor)
                }
                None => self.handle_cross_tree_collision(region1, region2, edge),
            },
            (Some(_), None) => self.handle_tree_hitting_matched(region1, region2, edge),
            (None, Some(_)) => {
                self.handle_tree_hitting_matched(region2, region1, edge.reversed())
            }
            (None, None) => {
                panic!("collision between two regions, neither of them in a tree")
            }
        }
    }

    /// An in-tree region ran into a region outside the forest. The outside
    /// region is either matched to another region (the pair gets adopted
    /// into the tree) or matched to the boundary (the tree augments through
    /// it).
    fn handle_tree_hitting_matched(
        &mut self,
        tree_region: RegionId,
        matched_region: RegionId,
        edge: CompressedEdge,
    ) {
        let partner = self.flooder.regions[matched_region.0]
            .match_
            .as_ref()
            .and_then(|m| m.region);
        match partner {
            Some(_) => self.adopt_matched_pair(tree_region, matched_region, edge),
            None => self.augment_through_boundary_match(tree_region, matched_region, edge),
        }
    }

    // --- augmenting --------------------------------------------------------

    /// Two different trees touched: flip the matching along root-to-root
    /// and retire both trees.
    fn handle_cross_tree_collision(
        &mut self,
        region1: RegionId,
        region2: RegionId,
        edge: CompressedEdge,
    ) {
        let tn1 = self.flooder.regions[region1.0]
            .alt_tree_node
            .expect("colliding region is in a tree");
        let tn2 = self.flooder.regions[region2.0]
            .alt_tree_node
            .expect("colliding region is in a tree");

        become_root(&mut self.tree, tn1);
        become_root(&mut self.tree, tn2);
        self.shatter_tree_into_matches(tn1);
        self.shatter_tree_into_matches(tn2);

        self.flooder.regions[region1.0].match_ = Some(Match {
            region: Some(region2),
            edge,
        });
        self.flooder.regions[region2.0].match_ = Some(Match {
            region: Some(region1),
            edge: edge.reversed(),
        });
        self.flooder.set_region_frozen(region1);
        self.flooder.set_region_frozen(region2);
    }

    /// A tree's outer region reached the boundary: augment the whole tree,
    /// matching its root into the boundary.
    fn handle_region_hit_boundary(&mut self, region: RegionId, edge: CompressedEdge) {
        let tn = self.flooder.regions[region.0]
            .alt_tree_node
            .expect("a region touching the boundary is in a tree");
        become_root(&mut self.tree, tn);
        self.shatter_tree_into_matches(tn);

        self.flooder.regions[region.0].match_ = Some(Match { region: None, edge });
        self.flooder.set_region_frozen(region);
    }

    /// A tree ran into a region already matched to the boundary: the tree
    /// region takes the region as its partner and the tree dissolves.
    fn augment_through_boundary_match(
        &mut self,
        tree_region: RegionId,
        matched_region: RegionId,
        edge: CompressedEdge,
    ) {
        let tn = self.flooder.regions[tree_region.0]
            .alt_tree_node
            .expect("tree region is in a tree");

        self.flooder.regions[tree_region.0].match_ = Some(Match {
            region: Some(matched_region),
            edge,
        });
        self.flooder.regions[matched_region.0].match_ = Some(Match {
            region: Some(tree_region),
            edge: edge.reversed(),
        });
        self.flooder.set_region_frozen(tree_region);

        become_root(&mut self.tree, tn);
        self.shatter_tree_into_matches(tn);
    }

    /// A tree's outer region hit one half of a matched pair: the pair is
    /// adopted as a new inner/outer layer of the tree.
    fn adopt_matched_pair(
        &mut self,
        tree_region: RegionId,
        matched_region: RegionId,
        edge: CompressedEdge,
    ) {
        let tn = self.flooder.regions[tree_region.0]
            .alt_tree_node
            .expect("tree region is in a tree");
        let m = self.flooder.regions[matched_region.0]
            .match_
            .clone()
            .expect("adopted region is matched");
        let partner = m.region.expect("adopted region is matched to a region");

        self.make_child(tn, matched_region, partner, m.edge, edge);

        self.flooder.regions[matched_region.0].match_ = None;
        self.flooder.regions[partner.0].match_ = None;
        self.flooder.set_region_shrinking(matched_region);
        self.flooder.set_region_growing(partner);
    }

    // --- blossom formation -------------------------------------------------

    /// Two branches of one tree touched: contract the odd cycle through
    /// their common ancestor into a blossom occupying the ancestor's outer
    /// slot.
    fn handle_same_tree_collision(
        &mut self,
        region1: RegionId,
        region2: RegionId,
        edge: CompressedEdge,
        ancestor: TreeNodeId,
    ) {
        let tn1 = self.flooder.regions[region1.0]
            .alt_tree_node
            .expect("colliding region is in a tree");
        let tn2 = self.flooder.regions[region2.0]
            .alt_tree_node
            .expect("colliding region is in a tree");

        let pruned1 = prune_upward_path(&mut self.tree, tn1, ancestor, true);
        let pruned2 = prune_upward_path(&mut self.tree, tn2, ancestor, false);

        // Cycle: ascend region2's side, descend region1's side, close with
        // the colliding edge.
        let mut cycle = pruned2.path_region_edges;
        cycle.extend(pruned1.path_region_edges.into_iter().rev());
        cycle.push(RegionEdge {
            region: region1,
            edge,
        });

        let blossom = self.flooder.create_blossom(cycle);
        self.tree[ancestor.0].outer_region = Some(blossom);
        self.flooder.regions[blossom.0].alt_tree_node = Some(ancestor);

        for orphan in pruned1.orphans.into_iter().chain(pruned2.orphans) {
            add_child(&mut self.tree, ancestor, orphan);
        }
    }

    // --- blossom implosion -------------------------------------------------

    /// A shrinking blossom retracted onto its children. The arc between the
    /// tree-facing children re-enters the tree with alternating growth; the
    /// complementary arc pairs off internally.
    fn handle_blossom_implode(
        &mut self,
        blossom: RegionId,
        in_parent: RegionId,
        in_child: RegionId,
    ) {
        let children = self.flooder.detach_blossom_children(blossom);
        let blossom_tn = self.flooder.regions[blossom.0]
            .alt_tree_node
            .expect("imploding blossom is in a tree");
        let size = children.len();
        let parent_idx = children
            .iter()
            .position(|c| c.region == in_parent)
            .expect("in_parent is a child of the blossom");
        let child_idx = children
            .iter()
            .position(|c| c.region == in_child)
            .expect("in_child is a child of the blossom");
        let gap = (child_idx + size - parent_idx) % size;

        let parent_tn = self.tree[blossom_tn.0]
            .parent
            .as_ref()
            .expect("imploding blossom has a tree parent")
            .node;
        detach_child(&mut self.tree[parent_tn.0].children, blossom_tn);
        let mut link_edge = self.tree[blossom_tn.0]
            .parent
            .as_ref()
            .expect("parent link still present")
            .edge
            .reversed();
        let mut cur_tn = parent_tn;

        let (evens_start, evens_end);
        if gap % 2 == 0 {
            // Walk forward from in_parent to in_child.
            evens_start = child_idx + 1;
            evens_end = child_idx + size - gap;
            let mut i = parent_idx;
            while i < parent_idx + gap {
                let k1 = i % size;
                let k2 = (i + 1) % size;
                cur_tn = self.make_child(
                    cur_tn,
                    children[k1].region,
                    children[k2].region,
                    children[k1].edge,
                    link_edge,
                );
                link_edge = children[k2].edge;
                self.flooder.set_region_shrinking(children[k1].region);
                self.flooder.set_region_growing(children[k2].region);
                i += 2;
            }
        } else {
            // Walk backward from in_parent to in_child.
            evens_start = parent_idx + 1;
            evens_end = parent_idx + gap;
            let mut i = 0;
            while i < size - gap {
                let k1 = (parent_idx + size - i) % size;
                let k2 = (parent_idx + size - i - 1) % size;
                let k3 = (parent_idx + size - i - 2) % size;
                cur_tn = self.make_child(
                    cur_tn,
                    children[k1].region,
                    children[k2].region,
                    children[k2].edge.reversed(),
                    link_edge,
                );
                link_edge = children[k3].edge.reversed();
                self.flooder.set_region_shrinking(children[k1].region);
                self.flooder.set_region_growing(children[k2].region);
                i += 2;
            }
        }

        // The complementary arc leaves the tree as matched pairs.
        let mut j = evens_start;
        while j < evens_end {
            let k1 = j % size;
            let k2 = (j + 1) % size;
            let r1 = children[k1].region;
            let r2 = children[k2].region;
            let e = children[k1].edge;
            self.flooder.regions[r1.0].match_ = Some(Match {
                region: Some(r2),
                edge: e,
            });
            self.flooder.regions[r2.0].match_ = Some(Match {
                region: Some(r1),
                edge: e.reversed(),
            });
            self.flooder.reschedule_region(r1);
            self.flooder.reschedule_region(r2);
            j += 2;
        }

        // The blossom's tree slot lives on with the touched child as its
        // new inner region.
        let new_inner = children[child_idx].region;
        self.tree[blossom_tn.0].inner_region = Some(new_inner);
        self.flooder.regions[new_inner.0].alt_tree_node = Some(blossom_tn);
        self.flooder.set_region_shrinking(new_inner);
        add_child(
            &mut self.tree,
            cur_tn,
            TreeLink {
                node: blossom_tn,
                edge: link_edge,
            },
        );

        self.flooder.regions.release(blossom.0);
    }

    // --- tree maintenance --------------------------------------------------

    /// Allocate a child pair (inner, outer) under `parent`, wiring region
    /// back-references. Returns the new tree node.
    fn make_child(
        &mut self,
        parent: TreeNodeId,
        inner: RegionId,
        outer: RegionId,
        inner_to_outer_edge: CompressedEdge,
        parent_to_child_edge: CompressedEdge,
    ) -> TreeNodeId {
        let child = TreeNodeId(self.tree.alloc());
        self.tree[child.0] = TreeNode::new_pair(inner, outer, inner_to_outer_edge);
        self.flooder.regions[inner.0].alt_tree_node = Some(child);
        self.flooder.regions[outer.0].alt_tree_node = Some(child);
        add_child(
            &mut self.tree,
            parent,
            TreeLink {
                node: child,
                edge: parent_to_child_edge,
            },
        );
        child
    }

    /// After a root-side augment, every inner/outer pair below `tn` becomes
    /// a frozen match and the tree dissolves.
    fn shatter_tree_into_matches(&mut self, tn: TreeNodeId) {
        let children = std::mem::take(&mut self.tree[tn.0].children);
        for child in &children {
            self.shatter_tree_into_matches(child.node);
        }

        if let Some(inner) = self.tree[tn.0].inner_region {
            let outer = self.tree[tn.0]
                .outer_region
                .expect("paired tree node has an outer region");
            let i2o = self.tree[tn.0].inner_to_outer_edge;
            self.flooder.regions[inner.0].match_ = Some(Match {
                region: Some(outer),
                edge: i2o,
            });
            self.flooder.regions[outer.0].match_ = Some(Match {
                region: Some(inner),
                edge: i2o.reversed(),
            });
            self.flooder.set_region_frozen(inner);
            self.flooder.set_region_frozen(outer);
            self.flooder.regions[inner.0].alt_tree_node = None;
        }
        if let Some(outer) = self.tree[tn.0].outer_region {
            self.flooder.regions[outer.0].alt_tree_node = None;
        }
        self.tree.release(tn.0);
    }

    // --- match extraction --------------------------------------------------

    /// Finalize one matched component rooted at `region`: recursively
    /// shatter blossoms, pair their remaining children, and accumulate the
    /// observable mask and weight of everything freed.
    pub fn shatter_blossom_and_extract_matches(&mut self, region: RegionId) -> MatchingResult {
        let partner = self.flooder.regions[region.0]
            .match_
            .as_ref()
            .and_then(|m| m.region);
        let is_blossom = self.flooder.regions[region.0].is_blossom();

        match partner {
            Some(other) => {
                let other_is_blossom = self.flooder.regions[other.0].is_blossom();
                if !is_blossom && !other_is_blossom {
                    let edge = self.flooder.regions[region.0]
                        .match_
                        .as_ref()
                        .expect("region is matched")
                        .edge;
                    let w1 = self.flooder.regions[region.0].radius.base();
                    let w2 = self.flooder.regions[other.0].radius.base();
                    self.flooder.regions.release(other.0);
                    self.flooder.regions.release(region.0);
                    self.flooder.match_edges.push(edge);
                    return MatchingResult {
                        obs_mask: edge.obs_mask,
                        weight: w1 + w2,
                    };
                }
            }
            None => {
                if !is_blossom {
                    // Boundary match.
                    let edge = self.flooder.regions[region.0]
                        .match_
                        .as_ref()
                        .expect("region is matched to the boundary")
                        .edge;
                    let w = self.flooder.regions[region.0].radius.base();
                    self.flooder.regions.release(region.0);
                    self.flooder.match_edges.push(edge);
                    return MatchingResult {
                        obs_mask: edge.obs_mask,
                        weight: w,
                    };
                }
            }
        }

        let mut result = MatchingResult::default();
        let mut region = region;
        if self.flooder.regions[region.0].is_blossom() {
            region = self.pass_match_to_subblossom(region, &mut result);
        }
        let partner = self.flooder.regions[region.0]
            .match_
            .as_ref()
            .and_then(|m| m.region);
        if let Some(other) = partner {
            if self.flooder.regions[other.0].is_blossom() {
                self.pass_match_to_subblossom(other, &mut result);
            }
        }
        result += self.shatter_blossom_and_extract_matches(region);
        result
    }

    /// Shatter one blossom, handing its match down to the child that owns
    /// the match edge's anchor node, and pairing the remaining children
    /// around the cycle. Returns the inheriting child.
    fn pass_match_to_subblossom(
        &mut self,
        blossom: RegionId,
        result: &mut MatchingResult,
    ) -> RegionId {
        // Resolve the heir before detaching: the walk needs the intact
        // ancestry chain.
        let match_edge = self.flooder.regions[blossom.0]
            .match_
            .as_ref()
            .expect("shattered blossom is matched")
            .edge;
        let anchor = match_edge.loc_from.expect("match edge has an anchor node");
        let heir = self.flooder.graph.nodes[anchor.0 as usize]
            .heir_region_on_shatter(self.flooder.regions.slots())
            .expect("match anchor lies inside the blossom");

        let children = self.flooder.detach_blossom_children(blossom);

        let blossom_match = self.flooder.regions[blossom.0]
            .match_
            .clone()
            .expect("shattered blossom is matched");
        self.flooder.regions[heir.0].match_ = Some(Match {
            region: blossom_match.region,
            edge: blossom_match.edge,
        });
        if let Some(other) = blossom_match.region {
            self.flooder.regions[other.0].match_ = Some(Match {
                region: Some(heir),
                edge: blossom_match.edge.reversed(),
            });
        }

        result.weight += self.flooder.regions[blossom.0].radius.base();

        let index = children
            .iter()
            .position(|c| c.region == heir)
            .expect("heir is a child of the blossom");
        let size = children.len();
        let mut i = 0;
        while i + 1 < size {
            let c1 = &children[(index + i + 1) % size];
            let c2 = &children[(index + i + 2) % size];
            self.flooder.regions[c1.region.0].match_ = Some(Match {
                region: Some(c2.region),
                edge: c1.edge,
            });
            self.flooder.regions[c2.region.0].match_ = Some(Match {
                region: Some(c1.region),
                edge: c1.edge.reversed(),
            });
            let r1 = c1.region;
            *result += self.shatter_blossom_and_extract_matches(r1);
            i += 2;
        }

        self.flooder.regions.release(blossom.0);
        heir
    }

    /// Nodes touched by a matched component, collected before shattering so
    /// the driver can reset exactly those.
    pub fn collect_component_nodes(&self, region: RegionId) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        nodes_in_total_area(&self.flooder.regions, region, &mut nodes);
        let partner = self.flooder.regions[region.0]
            .match_
            .as_ref()
            .and_then(|m| m.region);
        if let Some(other) = partner {
            nodes_in_total_area(&self.flooder.regions, other, &mut nodes);
        }
        nodes
    }

    /// Full reset for error paths and tests; normal decodes reset lazily.
    pub fn reset(&mut self) {
        self.flooder.reset();
        self.tree.clear();
    }
}
