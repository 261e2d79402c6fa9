//! Ensemble building blocks: diversity, risk, outcomes, weights and decision history.

pub mod diversity;
pub mod history;
pub mod method;
pub mod outcome;
pub mod risk_assessor;
pub mod weights;

pub use diversity::{DiversityAnalyzer, DiversityMetrics};
pub use history::{DecisionHistory, DecisionRecord};
pub use method::AggregationMethod;
pub use risk_assessor::{RiskAssessor, RiskThresholds};
pub use weights::{WeightBounds, WeightChange, WeightPartition, WeightSnapshot, WeightTable};
