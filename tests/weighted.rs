use floodmatch::driver::weighted::{merge_weights, WeightedGraph, NUM_DISTINCT_WEIGHTS};
use floodmatch::error::MatchingError;
use floodmatch::flood::graph::BOUNDARY_NODE;
use floodmatch::ints::NodeId;

#[test]
fn merge_rule_matches_the_channel_algebra() {
    // Two p=0.1 channels on one edge combine to p' = 0.18.
    let w = (0.9f64 / 0.1).ln();
    let merged = merge_weights(w, w);
    let expected = (0.82f64 / 0.18).ln();
    assert!(
        (merged - expected).abs() < 1e-9,
        "merged {merged} vs expected {expected}"
    );
}

#[test]
fn merge_rule_is_commutative() {
    for &(a, b) in &[(2.2, 0.7), (-1.5, 3.0), (0.0, 1.0), (-2.0, -0.5)] {
        let ab = merge_weights(a, b);
        let ba = merge_weights(b, a);
        assert!((ab - ba).abs() < 1e-12, "merge({a},{b}) not commutative");
    }
}

#[test]
fn merge_rule_identity_at_infinity() {
    for &a in &[1.5, -0.3, 4.0] {
        let merged = merge_weights(a, f64::INFINITY);
        assert!((merged - a).abs() < 1e-12, "merge({a}, inf) = {merged}");
    }
}

#[test]
fn parallel_edges_merge_instead_of_stacking() {
    let mut g = WeightedGraph::new();
    let w = (0.9f64 / 0.1).ln();
    g.add_or_merge_edge(0, 1, w, &[0]);
    g.add_or_merge_edge(1, 0, w, &[0]);
    assert_eq!(g.num_edges(), 1);
    let expected = (0.82f64 / 0.18).ln();
    assert!((g.edges[0].weight - expected).abs() < 1e-9);
}

#[test]
fn boundary_edges_merge_per_node() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_boundary_edge(0, 2.0, &[]);
    g.add_or_merge_boundary_edge(0, 2.0, &[]);
    g.add_or_merge_boundary_edge(1, 2.0, &[]);
    assert_eq!(g.num_edges(), 2);
    assert!((g.edges[0].weight - merge_weights(2.0, 2.0)).abs() < 1e-12);
    assert!((g.edges[1].weight - 2.0).abs() < 1e-12);
}

#[test]
fn dem_instruction_routes_by_detector_count() {
    let mut g = WeightedGraph::new();
    g.handle_dem_instruction(0.1, &[0, 1], &[0]);
    g.handle_dem_instruction(0.2, &[2], &[]);
    g.handle_dem_instruction(0.0, &[0, 1], &[]); // ignored
    g.handle_dem_instruction(1.0, &[0], &[]); // ignored
    assert_eq!(g.num_edges(), 2);
    assert!((g.edges[0].weight - (0.9f64 / 0.1).ln()).abs() < 1e-12);
    assert_eq!(g.edges[1].node2, usize::MAX);
}

#[test]
fn observables_track_the_largest_index() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 1, 1.0, &[3]);
    assert_eq!(g.num_observables, 4);
    g.add_or_merge_boundary_edge(0, 1.0, &[7]);
    assert_eq!(g.num_observables, 8);
}

#[test]
fn discretization_scales_and_doubles() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 1, 1.0, &[0]);
    g.add_or_merge_edge(1, 2, 0.5, &[]);
    let mg = g.to_matching_graph(NUM_DISTINCT_WEIGHTS).unwrap();

    let max = (NUM_DISTINCT_WEIGHTS - 1) as i64 * 2;
    assert_eq!(mg.nodes[0].neighbor_weights[0] as i64, max);
    // Half the max weight, rounded on the pre-doubling grid.
    let half = ((NUM_DISTINCT_WEIGHTS - 1) as f64 * 0.5).round() as i64 * 2;
    assert_eq!(mg.nodes[1].neighbor_weights[1] as i64, half);
    assert!((mg.normalising_constant - max as f64).abs() < 1e-6);
}

#[test]
fn negative_weights_survive_discretization_with_flips() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 1, -1.0, &[0]);
    g.add_or_merge_edge(1, 2, 1.0, &[1]);
    let mg = g.to_matching_graph(NUM_DISTINCT_WEIGHTS).unwrap();

    assert!(mg.negative_weight_detection_events.contains(&0));
    assert!(mg.negative_weight_detection_events.contains(&1));
    assert!(mg.negative_weight_observables.contains(&0));
    assert!(mg.negative_weight_sum < 0);
    // Stored magnitudes are equal for equal |weight|.
    assert_eq!(
        mg.nodes[0].neighbor_weights[0],
        mg.nodes[2].neighbor_weights[0]
    );
}

#[test]
fn declared_boundary_nodes_route_to_the_virtual_boundary() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 1, 1.0, &[0]);
    g.add_or_merge_edge(1, 2, 1.0, &[]);
    g.set_boundary([2usize].into_iter().collect());
    let mg = g.to_matching_graph(NUM_DISTINCT_WEIGHTS).unwrap();

    // Edge 1-2 became a boundary edge on node 1.
    assert_eq!(mg.nodes[1].neighbors[0], BOUNDARY_NODE);
    assert_eq!(mg.nodes[1].neighbors[1], NodeId(0));
    assert!(mg.nodes[2].neighbors.is_empty());
    assert!(mg.declared_boundary[2]);
    assert!(!mg.declared_boundary[0]);
}

#[test]
fn edges_between_two_boundary_nodes_vanish() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 1, 1.0, &[]);
    g.add_or_merge_edge(1, 2, 1.0, &[]);
    g.set_boundary([1usize, 2].into_iter().collect());
    let mg = g.to_matching_graph(NUM_DISTINCT_WEIGHTS).unwrap();
    assert_eq!(mg.nodes[0].neighbors[0], BOUNDARY_NODE);
    assert!(mg.nodes[1].neighbors.is_empty());
    assert!(mg.nodes[2].neighbors.is_empty());
}

#[test]
fn too_many_observables_is_rejected() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 1, 1.0, &[64]);
    match g.to_mwpm() {
        Err(MatchingError::TooManyObservables { num_observables }) => {
            assert_eq!(num_observables, 65)
        }
        other => panic!("expected TooManyObservables, got {other:?}"),
    }
}

#[test]
fn search_graph_mirrors_the_routing() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 1, 1.0, &[0]);
    g.add_or_merge_boundary_edge(0, 0.5, &[1]);
    let sg = g.to_search_graph(NUM_DISTINCT_WEIGHTS);
    assert_eq!(sg.nodes[0].neighbors[0], None);
    assert_eq!(sg.nodes[0].neighbors[1].unwrap().0, 1);
    assert_eq!(sg.nodes[0].neighbor_observables[0], 0b10);
    assert_eq!(sg.nodes[1].neighbors.len(), 1);
}

#[test]
fn counts() {
    let mut g = WeightedGraph::new();
    g.add_or_merge_edge(0, 3, 1.0, &[]);
    assert_eq!(g.num_nodes(), 4);
    g.set_boundary([3usize].into_iter().collect());
    assert_eq!(g.num_detectors(), 3);
}
