//! Color-coding dynamic programming over the sub-template tree

pub mod coloring;
pub mod colorsets;
pub mod engine;
pub mod exact;
pub mod plan;
pub mod table;

pub use coloring::ColorSampler;
pub use colorsets::ColorSetIndex;
pub use engine::{CountingEngine, LocalExchange, PassResult, RowExchange};
pub use exact::{colorful_matches, ColorfulMatches};
pub use plan::TemplatePlan;
pub use table::{Count, DynamicTable};
