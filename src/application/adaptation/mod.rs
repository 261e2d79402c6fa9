pub mod weight_adapter;

pub use weight_adapter::{AdaptationReport, WeightAdapter};
