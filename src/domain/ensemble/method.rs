use crate::domain::errors::EnsembleError;
use serde::{Deserialize, Serialize};

/// Aggregation algorithm used to reduce a signal batch to one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    MajorityVote,
    #[default]
    PerformanceWeighted,
    Bayesian,
    Stacking,
    DynamicContextual,
}

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 5] = [
        AggregationMethod::MajorityVote,
        AggregationMethod::PerformanceWeighted,
        AggregationMethod::Bayesian,
        AggregationMethod::Stacking,
        AggregationMethod::DynamicContextual,
    ];

    /// Stable identifier used in config, metrics labels and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::MajorityVote => "majority_vote",
            AggregationMethod::PerformanceWeighted => "performance_weighted",
            AggregationMethod::Bayesian => "bayesian",
            AggregationMethod::Stacking => "stacking",
            AggregationMethod::DynamicContextual => "dynamic_contextual",
        }
    }
}

impl std::str::FromStr for AggregationMethod {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "majority" | "majority_vote" | "voting" => Ok(AggregationMethod::MajorityVote),
            "performance" | "performance_weighted" | "weighted" => {
                Ok(AggregationMethod::PerformanceWeighted)
            }
            "bayesian" | "bayesian_averaging" | "bma" => Ok(AggregationMethod::Bayesian),
            "stacking" | "stacked" | "meta_learner" => Ok(AggregationMethod::Stacking),
            "dynamic" | "contextual" | "dynamic_contextual" | "dynamic_selection" => {
                Ok(AggregationMethod::DynamicContextual)
            }
            _ => Err(EnsembleError::UnknownStrategy {
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationMethod::MajorityVote => write!(f, "MajorityVote"),
            AggregationMethod::PerformanceWeighted => write!(f, "PerformanceWeighted"),
            AggregationMethod::Bayesian => write!(f, "Bayesian"),
            AggregationMethod::Stacking => write!(f, "Stacking"),
            AggregationMethod::DynamicContextual => write!(f, "DynamicContextual"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            AggregationMethod::from_str("Majority-Vote").unwrap(),
            AggregationMethod::MajorityVote
        );
        assert_eq!(
            AggregationMethod::from_str("meta_learner").unwrap(),
            AggregationMethod::Stacking
        );
        assert_eq!(
            AggregationMethod::from_str("contextual").unwrap(),
            AggregationMethod::DynamicContextual
        );
    }

    #[test]
    fn test_unknown_name_is_unknown_strategy() {
        let err = AggregationMethod::from_str("random_forest").unwrap_err();
        assert!(matches!(err, EnsembleError::UnknownStrategy { name } if name == "random_forest"));
    }

    #[test]
    fn test_as_str_round_trips_through_parse() {
        for method in AggregationMethod::ALL {
            assert_eq!(AggregationMethod::from_str(method.as_str()).unwrap(), method);
        }
    }
}
