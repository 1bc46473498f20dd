//! The alternating-tree forest.
//!
//! Each `TreeNode` is a *pair* of alternating layers: an inner (shrinking)
//! region and an outer (growing) region, joined by `inner_to_outer_edge`.
//! Roots carry only an outer region. Tree edges always connect a parent's
//! outer region to a child's inner region; a link's edge is oriented from
//! the node it is stored on toward the other end.

use crate::events::{CompressedEdge, RegionEdge};
use crate::ints::{RegionId, TreeNodeId};
use crate::pool::Pool;

#[derive(Debug, Clone)]
pub struct TreeLink {
    pub node: TreeNodeId,
    pub edge: CompressedEdge,
}

#[derive(Debug, Default)]
pub struct TreeNode {
    pub inner_region: Option<RegionId>,
    pub outer_region: Option<RegionId>,
    pub inner_to_outer_edge: CompressedEdge,
    pub parent: Option<TreeLink>,
    pub children: Vec<TreeLink>,
    pub visited: bool,
}

impl TreeNode {
    pub fn new_root(outer_region: RegionId) -> Self {
        TreeNode {
            outer_region: Some(outer_region),
            ..TreeNode::default()
        }
    }

    pub fn new_pair(
        inner_region: RegionId,
        outer_region: RegionId,
        inner_to_outer_edge: CompressedEdge,
    ) -> Self {
        TreeNode {
            inner_region: Some(inner_region),
            outer_region: Some(outer_region),
            inner_to_outer_edge,
            ..TreeNode::default()
        }
    }
}

/// Attach `link.node` as a child of `parent`. `link.edge` is oriented
/// parent-to-child; the child's back link stores the reverse.
pub fn add_child(pool: &mut Pool<TreeNode>, parent: TreeNodeId, link: TreeLink) {
    pool[link.node.0].parent = Some(TreeLink {
        node: parent,
        edge: link.edge.reversed(),
    });
    pool[parent.0].children.push(link);
}

/// Remove the child link pointing at `target`. Order is not preserved.
pub fn detach_child(children: &mut Vec<TreeLink>, target: TreeNodeId) -> bool {
    match children.iter().position(|l| l.node == target) {
        Some(i) => {
            children.swap_remove(i);
            true
        }
        None => false,
    }
}

/// Rotate the tree so `node` becomes its root. The inner regions shift one
/// step toward the old root along the way: each former parent inherits its
/// rotating child's inner region and inner-to-outer edge.
pub fn become_root(pool: &mut Pool<TreeNode>, node: TreeNodeId) {
    let parent_link = match pool[node.0].parent.clone() {
        Some(link) => link,
        None => return,
    };
    let old_parent = parent_link.node;
    become_root(pool, old_parent);

    let inner = pool[node.0].inner_region;
    let i2o = pool[node.0].inner_to_outer_edge;

    pool[old_parent.0].inner_region = inner;
    pool[old_parent.0].inner_to_outer_edge = parent_link.edge;
    pool[node.0].inner_region = None;

    detach_child(&mut pool[old_parent.0].children, node);
    pool[node.0].parent = None;

    let down_edge = i2o.reversed();
    add_child(
        pool,
        node,
        TreeLink {
            node: old_parent,
            edge: down_edge,
        },
    );
    pool[node.0].inner_to_outer_edge = CompressedEdge::default();
}

/// Most recent common ancestor of `a` and `b`, or `None` when they are in
/// different trees. On success the nodes on both upward paths below the
/// ancestor keep their `visited` flags set; the caller prunes them right
/// away, which frees the flags with the nodes.
pub fn common_ancestor(
    pool: &mut Pool<TreeNode>,
    a: TreeNodeId,
    b: TreeNodeId,
) -> Option<TreeNodeId> {
    pool[a.0].visited = true;
    pool[b.0].visited = true;

    let mut a_cur = a;
    let mut b_cur = b;
    let found = loop {
        let a_up = pool[a_cur.0].parent.as_ref().map(|l| l.node);
        let b_up = pool[b_cur.0].parent.as_ref().map(|l| l.node);
        if a_up.is_none() && b_up.is_none() {
            clear_visited_chain(pool, a);
            clear_visited_chain(pool, b);
            return None;
        }
        if let Some(up) = a_up {
            a_cur = up;
            if pool[a_cur.0].visited {
                break a_cur;
            }
            pool[a_cur.0].visited = true;
        }
        if let Some(up) = b_up {
            b_cur = up;
            if pool[b_cur.0].visited {
                break b_cur;
            }
            pool[b_cur.0].visited = true;
        }
    };

    // Clear the ancestor and whatever was marked above it.
    pool[found.0].visited = false;
    let mut above = pool[found.0].parent.as_ref().map(|l| l.node);
    while let Some(idx) = above {
        if !pool[idx.0].visited {
            break;
        }
        pool[idx.0].visited = false;
        above = pool[idx.0].parent.as_ref().map(|l| l.node);
    }
    Some(found)
}

fn clear_visited_chain(pool: &mut Pool<TreeNode>, start: TreeNodeId) {
    let mut cur = Some(start);
    while let Some(idx) = cur {
        if !pool[idx.0].visited {
            break;
        }
        pool[idx.0].visited = false;
        cur = pool[idx.0].parent.as_ref().map(|l| l.node);
    }
}

pub struct PruneResult {
    /// Children of the pruned nodes, to be re-homed by the caller.
    pub orphans: Vec<TreeLink>,
    /// The pruned path as a region/edge sequence ready to splice into a
    /// blossom cycle.
    pub path_region_edges: Vec<RegionEdge>,
}

/// Remove the path from `start` up to (excluding) `stop_before`, freeing
/// the nodes. With `back` set the edges are emitted inner-first (the
/// ascending orientation); otherwise outer-first (descending).
pub fn prune_upward_path(
    pool: &mut Pool<TreeNode>,
    start: TreeNodeId,
    stop_before: TreeNodeId,
    back: bool,
) -> PruneResult {
    let mut orphans: Vec<TreeLink> = Vec::new();
    let mut path_region_edges: Vec<RegionEdge> = Vec::new();
    let mut cur = start;

    while cur != stop_before {
        let mut children = std::mem::take(&mut pool[cur.0].children);
        orphans.append(&mut children);

        let inner = pool[cur.0].inner_region.expect("pruned node has an inner region");
        let outer = pool[cur.0].outer_region.expect("pruned node has an outer region");
        let i2o = pool[cur.0].inner_to_outer_edge;
        let parent_link = pool[cur.0]
            .parent
            .clone()
            .expect("pruned path stays below the stop node");
        let parent_outer = pool[parent_link.node.0]
            .outer_region
            .expect("tree parent has an outer region");

        if back {
            path_region_edges.push(RegionEdge {
                region: inner,
                edge: i2o,
            });
            path_region_edges.push(RegionEdge {
                region: parent_outer,
                edge: parent_link.edge.reversed(),
            });
        } else {
            path_region_edges.push(RegionEdge {
                region: outer,
                edge: i2o.reversed(),
            });
            path_region_edges.push(RegionEdge {
                region: inner,
                edge: parent_link.edge,
            });
        }

        detach_child(&mut pool[parent_link.node.0].children, cur);
        pool.release(cur.0);
        cur = parent_link.node;
    }

    PruneResult {
        orphans,
        path_region_edges,
    }
}
