pub mod flooder;
pub mod graph;
pub mod node;
pub mod region;

pub use flooder::GraphFlooder;
pub use graph::{MatchingGraph, BOUNDARY_NODE};
pub use node::DetectorNode;
pub use region::GraphFillRegion;
