use floodmatch::events::MwpmEvent;
use floodmatch::flood::flooder::GraphFlooder;
use floodmatch::flood::graph::MatchingGraph;
use floodmatch::ints::NodeId;
use floodmatch::matcher::mwpm::{MatchingResult, Mwpm};

fn mwpm_from(graph: MatchingGraph) -> Mwpm {
    Mwpm::new(GraphFlooder::new(graph))
}

/// Drain the event loop, returning every MWPM event that was processed.
fn drain(mwpm: &mut Mwpm) -> Vec<MwpmEvent> {
    let mut events = Vec::new();
    loop {
        let event = mwpm.next_mwpm_event();
        if event.is_no_event() {
            return events;
        }
        mwpm.process_event(event.clone());
        events.push(event);
        assert!(events.len() < 1000, "event loop failed to terminate");
    }
}

/// Driver-style extraction: shatter every matched component and reset the
/// touched nodes.
fn extract(mwpm: &mut Mwpm, defects: &[u32]) -> MatchingResult {
    let mut result = MatchingResult::default();
    for &d in defects {
        if mwpm.flooder.graph.nodes[d as usize]
            .region_that_arrived
            .is_none()
        {
            continue;
        }
        let top = mwpm.flooder.graph.nodes[d as usize]
            .region_that_arrived_top
            .unwrap();
        let touched = mwpm.collect_component_nodes(top);
        result += mwpm.shatter_blossom_and_extract_matches(top);
        for node in touched {
            mwpm.flooder.graph.nodes[node.0 as usize].reset();
        }
    }
    result
}

/// Finalized pairs as sorted (from, to) with -1 for the boundary.
fn matched_pairs(mwpm: &Mwpm) -> Vec<(i64, i64)> {
    let mut pairs: Vec<(i64, i64)> = mwpm
        .flooder
        .match_edges
        .iter()
        .map(|e| {
            let a = e.loc_from.map_or(-1, |n| n.0 as i64);
            let b = e.loc_to.map_or(-1, |n| n.0 as i64);
            if a == -1 || b == -1 {
                (a.max(b), -1)
            } else {
                (a.min(b), a.max(b))
            }
        })
        .collect();
    pairs.sort_unstable();
    pairs
}

#[test]
fn two_regions_augment_into_a_match() {
    let mut g = MatchingGraph::new(2, 1);
    g.add_edge(0, 1, 10, &[0]).unwrap();
    let mut mwpm = mwpm_from(g);

    mwpm.create_detection_event(NodeId(0));
    mwpm.create_detection_event(NodeId(1));
    let events = drain(&mut mwpm);
    assert_eq!(events.len(), 1);

    let r0 = mwpm.flooder.graph.nodes[0].region_that_arrived_top.unwrap();
    let r1 = mwpm.flooder.graph.nodes[1].region_that_arrived_top.unwrap();
    assert!(mwpm.flooder.regions[r0.0].match_.is_some());
    assert!(mwpm.flooder.regions[r1.0].match_.is_some());
    assert!(mwpm.flooder.regions[r0.0].radius.is_frozen());
    assert!(mwpm.flooder.regions[r1.0].radius.is_frozen());
    assert!(mwpm.flooder.regions[r0.0].alt_tree_node.is_none());

    let result = extract(&mut mwpm, &[0, 1]);
    assert_eq!(result.obs_mask, 1);
    assert_eq!(result.weight, 10);
    assert_eq!(matched_pairs(&mwpm), vec![(0, 1)]);
}

#[test]
fn region_matches_the_boundary() {
    let mut g = MatchingGraph::new(1, 1);
    g.add_boundary_edge(0, 5, &[0]).unwrap();
    let mut mwpm = mwpm_from(g);

    mwpm.create_detection_event(NodeId(0));
    let events = drain(&mut mwpm);
    assert_eq!(events.len(), 1);

    let result = extract(&mut mwpm, &[0]);
    assert_eq!(result.obs_mask, 1);
    assert_eq!(result.weight, 5);
    assert_eq!(matched_pairs(&mwpm), vec![(0, -1)]);
}

#[test]
fn tree_adopts_matched_pair_then_fuses_on_degenerate_implosion() {
    // 0 --10-- 1 --10-- 2 --10-- 3 --[30]-- boundary, defects 0, 2, 3.
    //
    // Regions 2 and 3 match at t=5. Region 0 then hits the pair at t=15
    // and adopts it; region 2 shrinks to nothing at t=20, fusing regions
    // 0 and 3 into a blossom that reaches the boundary at t=40.
    let mut g = MatchingGraph::new(4, 4);
    g.add_edge(0, 1, 10, &[0]).unwrap();
    g.add_edge(1, 2, 10, &[1]).unwrap();
    g.add_edge(2, 3, 10, &[2]).unwrap();
    g.add_boundary_edge(3, 30, &[3]).unwrap();
    let mut mwpm = mwpm_from(g);

    for d in [0u32, 2, 3] {
        mwpm.create_detection_event(NodeId(d));
    }
    let events = drain(&mut mwpm);
    // Collide, adopt, degenerate implosion, boundary.
    assert_eq!(events.len(), 4);
    assert!(matches!(events[3], MwpmEvent::RegionHitBoundary { .. }));
    assert_eq!(mwpm.flooder.queue.cur_time, 40);

    let result = extract(&mut mwpm, &[0, 2, 3]);
    assert_eq!(result.weight, 50);
    assert_eq!(result.obs_mask, 0b1011);
    assert_eq!(matched_pairs(&mwpm), vec![(0, 2), (3, -1)]);
}

#[test]
fn same_tree_collision_forms_a_blossom() {
    // Triangle 0-1-2 with a boundary at 2. The 0-1 pair matches first;
    // region 2 adopts it and immediately collides with the far side of
    // the pair, contracting all three into a blossom.
    let mut g = MatchingGraph::new(3, 1);
    g.add_edge(0, 1, 2, &[0]).unwrap();
    g.add_edge(0, 2, 6, &[]).unwrap();
    g.add_edge(1, 2, 6, &[]).unwrap();
    g.add_boundary_edge(2, 20, &[]).unwrap();
    let mut mwpm = mwpm_from(g);

    for d in [0u32, 1, 2] {
        mwpm.create_detection_event(NodeId(d));
    }
    let events = drain(&mut mwpm);
    // Collide, adopt, blossom, boundary.
    assert_eq!(events.len(), 4);

    // The blossom is alive until extraction.
    assert!(
        mwpm.flooder
            .regions
            .slots()
            .iter()
            .any(|r| r.is_blossom()),
        "expected a live blossom region"
    );

    let result = extract(&mut mwpm, &[0, 1, 2]);
    assert_eq!(result.weight, 22);
    assert_eq!(result.obs_mask, 1);
    assert_eq!(matched_pairs(&mwpm), vec![(0, 1), (2, -1)]);
}

#[test]
fn blossom_implodes_back_into_the_tree() {
    // Triangle 0-1-2 plus an arm 1-3 and an arm 0-4 ending at the
    // boundary. All five nodes are defects. The triangle contracts into
    // a blossom, matches the arm at node 3, is adopted by region 4's
    // tree, shrinks, and implodes, re-expanding its children into the
    // tree. Cascading degenerate implosions then carry the tree to the
    // boundary.
    let mut g = MatchingGraph::new(5, 6);
    g.add_edge(0, 1, 4, &[0]).unwrap();
    g.add_edge(0, 2, 8, &[1]).unwrap();
    g.add_edge(1, 2, 8, &[2]).unwrap();
    g.add_edge(1, 3, 16, &[3]).unwrap();
    g.add_edge(0, 4, 24, &[4]).unwrap();
    g.add_boundary_edge(4, 60, &[5]).unwrap();
    let mut mwpm = mwpm_from(g);

    for d in 0u32..5 {
        mwpm.create_detection_event(NodeId(d));
    }
    let events = drain(&mut mwpm);

    let implosions = events
        .iter()
        .filter(|e| matches!(e, MwpmEvent::BlossomImplode { .. }))
        .count();
    assert_eq!(implosions, 1, "expected exactly one blossom implosion");
    assert!(matches!(
        events.last().unwrap(),
        MwpmEvent::RegionHitBoundary { .. }
    ));
    assert_eq!(mwpm.flooder.queue.cur_time, 60);

    let result = extract(&mut mwpm, &[0, 1, 2, 3, 4]);
    assert_eq!(result.weight, 84);
    assert_eq!(result.obs_mask, 0b101010);
    assert_eq!(matched_pairs(&mwpm), vec![(0, 2), (1, 3), (4, -1)]);
}

#[test]
fn extraction_is_reusable_after_lazy_reset() {
    let mut g = MatchingGraph::new(2, 1);
    g.add_edge(0, 1, 10, &[0]).unwrap();
    let mut mwpm = mwpm_from(g);

    for _ in 0..3 {
        mwpm.create_detection_event(NodeId(0));
        mwpm.create_detection_event(NodeId(1));
        drain(&mut mwpm);
        let result = extract(&mut mwpm, &[0, 1]);
        assert_eq!(result.obs_mask, 1);
        assert_eq!(result.weight, 10);
        // Driver-style lazy cleanup.
        mwpm.flooder.regions.clear();
        mwpm.tree.clear();
        mwpm.flooder.queue.reset();
        mwpm.flooder.match_edges.clear();
    }
}
