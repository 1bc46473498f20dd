pub mod mwpm;
pub mod tree;

pub use mwpm::{MatchingResult, Mwpm};
pub use tree::{TreeLink, TreeNode};
