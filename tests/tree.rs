use floodmatch::events::CompressedEdge;
use floodmatch::ints::{NodeId, RegionId, TreeNodeId};
use floodmatch::matcher::tree::{
    add_child, become_root, common_ancestor, detach_child, prune_upward_path, TreeLink, TreeNode,
};
use floodmatch::pool::Pool;

fn edge(from: u32, to: u32) -> CompressedEdge {
    CompressedEdge {
        loc_from: Some(NodeId(from)),
        loc_to: Some(NodeId(to)),
        obs_mask: 0,
    }
}

fn root(pool: &mut Pool<TreeNode>, outer: u32) -> TreeNodeId {
    let id = TreeNodeId(pool.alloc());
    pool[id.0] = TreeNode::new_root(RegionId(outer));
    id
}

fn pair(pool: &mut Pool<TreeNode>, inner: u32, outer: u32, i2o: CompressedEdge) -> TreeNodeId {
    let id = TreeNodeId(pool.alloc());
    pool[id.0] = TreeNode::new_pair(RegionId(inner), RegionId(outer), i2o);
    id
}

#[test]
fn add_child_wires_both_directions() {
    let mut pool: Pool<TreeNode> = Pool::new();
    let r = root(&mut pool, 0);
    let c = pair(&mut pool, 1, 2, edge(10, 11));

    add_child(
        &mut pool,
        r,
        TreeLink {
            node: c,
            edge: edge(0, 10),
        },
    );

    assert_eq!(pool[r.0].children.len(), 1);
    assert_eq!(pool[r.0].children[0].node, c);
    let back = pool[c.0].parent.as_ref().unwrap();
    assert_eq!(back.node, r);
    assert_eq!(back.edge, edge(10, 0));
}

#[test]
fn detach_child_removes_by_id() {
    let mut pool: Pool<TreeNode> = Pool::new();
    let r = root(&mut pool, 0);
    let c1 = pair(&mut pool, 1, 2, edge(1, 2));
    let c2 = pair(&mut pool, 3, 4, edge(3, 4));
    add_child(&mut pool, r, TreeLink { node: c1, edge: edge(0, 1) });
    add_child(&mut pool, r, TreeLink { node: c2, edge: edge(0, 3) });

    assert!(detach_child(&mut pool[r.0].children, c1));
    assert_eq!(pool[r.0].children.len(), 1);
    assert_eq!(pool[r.0].children[0].node, c2);
    assert!(!detach_child(&mut pool[r.0].children, c1));
}

#[test]
fn become_root_swaps_inner_regions_down_the_path() {
    // root(outer r0) -> child(inner r1, outer r2)
    let mut pool: Pool<TreeNode> = Pool::new();
    let r = root(&mut pool, 0);
    let c = pair(&mut pool, 1, 2, edge(10, 11));
    add_child(&mut pool, r, TreeLink { node: c, edge: edge(0, 10) });

    become_root(&mut pool, c);

    // The child is now parentless; the old root hangs beneath it and has
    // inherited the child's inner region.
    assert!(pool[c.0].parent.is_none());
    assert!(pool[c.0].inner_region.is_none());
    assert_eq!(pool[c.0].children.len(), 1);
    assert_eq!(pool[c.0].children[0].node, r);
    assert_eq!(pool[r.0].inner_region, Some(RegionId(1)));
    assert_eq!(pool[r.0].outer_region, Some(RegionId(0)));
    assert_eq!(pool[r.0].parent.as_ref().unwrap().node, c);
    // The old root's inner-to-outer edge is the former child-to-parent
    // tree edge.
    assert_eq!(pool[r.0].inner_to_outer_edge, edge(10, 0));
    // The new root-to-child edge descends through the old inner region.
    assert_eq!(pool[c.0].children[0].edge, edge(11, 10));
}

#[test]
fn common_ancestor_meets_in_the_middle() {
    // root -> a -> b, root -> c. MRCA(b, c) = root, MRCA(a, b) = a.
    let mut pool: Pool<TreeNode> = Pool::new();
    let r = root(&mut pool, 0);
    let a = pair(&mut pool, 1, 2, edge(1, 2));
    let b = pair(&mut pool, 3, 4, edge(3, 4));
    let c = pair(&mut pool, 5, 6, edge(5, 6));
    add_child(&mut pool, r, TreeLink { node: a, edge: edge(0, 1) });
    add_child(&mut pool, a, TreeLink { node: b, edge: edge(2, 3) });
    add_child(&mut pool, r, TreeLink { node: c, edge: edge(0, 5) });

    assert_eq!(common_ancestor(&mut pool, b, c), Some(r));
    // Flags above the ancestor are cleared; the paths below stay marked
    // for pruning. Clear them by hand before the next query.
    pool[b.0].visited = false;
    pool[c.0].visited = false;
    pool[a.0].visited = false;
    assert!(!pool[r.0].visited);

    assert_eq!(common_ancestor(&mut pool, a, b), Some(a));
}

#[test]
fn common_ancestor_of_ancestor_and_descendant() {
    let mut pool: Pool<TreeNode> = Pool::new();
    let r = root(&mut pool, 0);
    let a = pair(&mut pool, 1, 2, edge(1, 2));
    let b = pair(&mut pool, 3, 4, edge(3, 4));
    add_child(&mut pool, r, TreeLink { node: a, edge: edge(0, 1) });
    add_child(&mut pool, a, TreeLink { node: b, edge: edge(2, 3) });

    assert_eq!(common_ancestor(&mut pool, r, b), Some(r));
}

#[test]
fn common_ancestor_different_trees_is_none() {
    let mut pool: Pool<TreeNode> = Pool::new();
    let r1 = root(&mut pool, 0);
    let a = pair(&mut pool, 1, 2, edge(1, 2));
    add_child(&mut pool, r1, TreeLink { node: a, edge: edge(0, 1) });
    let r2 = root(&mut pool, 3);
    let b = pair(&mut pool, 4, 5, edge(4, 5));
    add_child(&mut pool, r2, TreeLink { node: b, edge: edge(3, 4) });

    assert_eq!(common_ancestor(&mut pool, a, b), None);
    // Different-tree queries clean their flags up completely.
    for id in [r1, a, r2, b] {
        assert!(!pool[id.0].visited, "flag left set on {id:?}");
    }
}

#[test]
fn prune_upward_path_forward_orientation() {
    // root(outer 0) -> n1(inner 1, outer 2) -> n2(inner 3, outer 4).
    let mut pool: Pool<TreeNode> = Pool::new();
    let r = root(&mut pool, 0);
    let n1 = pair(&mut pool, 1, 2, edge(10, 11));
    let n2 = pair(&mut pool, 3, 4, edge(12, 13));
    add_child(&mut pool, r, TreeLink { node: n1, edge: edge(20, 21) });
    add_child(&mut pool, n1, TreeLink { node: n2, edge: edge(22, 23) });
    let orphan = pair(&mut pool, 5, 6, edge(14, 15));
    add_child(&mut pool, n2, TreeLink { node: orphan, edge: edge(24, 25) });

    let pruned = prune_upward_path(&mut pool, n2, r, false);

    // Path edges alternate outer, inner per pruned node, bottom up.
    let regions: Vec<RegionId> = pruned
        .path_region_edges
        .iter()
        .map(|re| re.region)
        .collect();
    assert_eq!(
        regions,
        vec![RegionId(4), RegionId(3), RegionId(2), RegionId(1)]
    );
    assert_eq!(pruned.orphans.len(), 1);
    assert_eq!(pruned.orphans[0].node, orphan);
    assert!(pool[r.0].children.is_empty());
}

#[test]
fn prune_upward_path_back_orientation() {
    let mut pool: Pool<TreeNode> = Pool::new();
    let r = root(&mut pool, 0);
    let n1 = pair(&mut pool, 1, 2, edge(10, 11));
    add_child(&mut pool, r, TreeLink { node: n1, edge: edge(20, 21) });

    let pruned = prune_upward_path(&mut pool, n1, r, true);

    let regions: Vec<RegionId> = pruned
        .path_region_edges
        .iter()
        .map(|re| re.region)
        .collect();
    // Ascending orientation: the inner region first, then the parent's
    // outer region.
    assert_eq!(regions, vec![RegionId(1), RegionId(0)]);
    assert_eq!(pruned.path_region_edges[0].edge, edge(10, 11));
    assert_eq!(pruned.path_region_edges[1].edge, edge(20, 21).reversed());
}
