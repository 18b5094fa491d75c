//! Core library functions for the distributed subgraph counter

pub mod combinatorics;
pub mod config;
pub mod counting;
pub mod data;
pub mod distributed;
pub mod error;
pub mod graph;
pub mod storage;
pub mod template;

pub use config::Config;
pub use counting::{Count, TemplatePlan};
pub use distributed::{run_local, run_with_assignment, CountResult};
pub use error::{Result, SubgraphError};
pub use graph::Graph;
