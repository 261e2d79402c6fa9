use super::{
    AggregationStrategy, BayesianStrategy, DynamicContextualStrategy, MajorityVoteStrategy,
    PerformanceWeightedStrategy, StackingStrategy,
};
use crate::domain::ensemble::AggregationMethod;
use crate::domain::errors::EnsembleError;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each aggregation method to its strategy
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<AggregationMethod, Arc<dyn AggregationStrategy>>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with all five built-in strategies
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(MajorityVoteStrategy));
        registry.register(Arc::new(PerformanceWeightedStrategy));
        registry.register(Arc::new(BayesianStrategy));
        registry.register(Arc::new(StackingStrategy));
        registry.register(Arc::new(DynamicContextualStrategy));
        registry
    }

    /// Registers a strategy under its own method, replacing any previous one
    pub fn register(&mut self, strategy: Arc<dyn AggregationStrategy>) {
        self.strategies.insert(strategy.method(), strategy);
    }

    pub fn unregister(&mut self, method: AggregationMethod) -> Option<Arc<dyn AggregationStrategy>> {
        self.strategies.remove(&method)
    }

    pub fn get(&self, method: AggregationMethod) -> Result<Arc<dyn AggregationStrategy>, EnsembleError> {
        self.strategies
            .get(&method)
            .cloned()
            .ok_or_else(|| EnsembleError::UnknownStrategy {
                name: method.as_str().to_string(),
            })
    }

    pub fn methods(&self) -> Vec<AggregationMethod> {
        AggregationMethod::ALL
            .into_iter()
            .filter(|m| self.strategies.contains_key(m))
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_method() {
        let registry = StrategyRegistry::with_defaults();
        for method in AggregationMethod::ALL {
            assert_eq!(registry.get(method).unwrap().method(), method);
        }
        assert_eq!(registry.methods().len(), AggregationMethod::ALL.len());
    }

    #[test]
    fn test_unregistered_method_is_unknown() {
        let mut registry = StrategyRegistry::with_defaults();
        assert!(registry.unregister(AggregationMethod::Bayesian).is_some());

        let err = registry.get(AggregationMethod::Bayesian).err().unwrap();
        assert!(matches!(err, EnsembleError::UnknownStrategy { ref name } if name == "bayesian"));
    }
}
