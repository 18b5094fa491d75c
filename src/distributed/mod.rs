//! Mapper partitioning, boundary-row exchange and in-process orchestration

pub mod cluster;
pub mod routing;
pub mod transport;
pub mod worker;

pub use cluster::{run_local, run_with_assignment, CountResult, MapperTotal};
pub use routing::{CommPlan, MapperAssignment};
pub use transport::{ChannelTransport, TimedBarrier, Transport, UpdateBatch};
pub use worker::{Worker, WorkerReport};
