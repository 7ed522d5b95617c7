//! The on-disk CIR tree (the R-tree index within a BigWig/BigBed file) and
//! its traversal.

pub mod node;
pub mod traverse;

pub use node::{CirHeader, CirNode, InternalEntry, LeafEntry, CIR_TREE_MAGIC};
pub use traverse::IndexTraverser;
