//! Signal model shared by upstream strategies and the ensemble.

pub mod ensemble_signal;
pub mod types;

pub use ensemble_signal::{
    EnsembleSignal, ProbabilityDistribution, RiskAssessment, RiskLevel, shannon_entropy_bits,
};
pub use types::{ModelPerformance, ModelSignal, SignalAction};
