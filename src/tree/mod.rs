//! Course tree model and traversal

pub mod node;
pub mod traversal;

pub use node::Node;
pub use traversal::Traversal;
