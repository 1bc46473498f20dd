pub mod flooder;
pub mod graph;

pub use flooder::SearchFlooder;
pub use graph::SearchGraph;
