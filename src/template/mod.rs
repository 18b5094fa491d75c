//! Template validation, decomposition and symmetry

pub mod automorphism;
pub mod partitioner;
pub mod validate;

pub use automorphism::count_automorphisms;
pub use partitioner::{Partitioner, SubTemplate};
pub use validate::validate_template;
