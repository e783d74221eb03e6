pub mod ast;
pub mod open_option;
pub mod tea;
pub mod contains;
pub mod normal;
pub mod cache;

pub use ast::{NodeType, NodeValue, TreeNode};
pub use contains::OptionParser;
pub use open_option::{FullTextFileId, OpenOption};
