//! Graph representation module

pub mod adjacency;
pub mod builder;

pub use adjacency::Graph;
pub use builder::{AdjacencyRecord, GraphBuilder};
