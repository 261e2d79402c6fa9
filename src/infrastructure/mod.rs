pub mod mock;
pub mod observability;

pub use observability::EnsembleMetrics;
