use crate::domain::signal::{ModelSignal, shannon_entropy_bits};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Agreement and spread metrics over one signal batch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiversityMetrics {
    /// Mean over unordered pairs of `same_action * (1 - |conf_a - conf_b|)`
    pub average_pairwise_correlation: f64,
    /// Shannon entropy (bits) of the empirical action distribution
    pub entropy: f64,
    pub gini_index: f64,
    /// Population variance of confidences
    pub variance: f64,
}

impl DiversityMetrics {
    /// Entropy scaled into [0, 1] by the three-action maximum
    pub fn normalized_entropy(&self) -> f64 {
        (self.entropy / max_entropy_bits()).clamp(0.0, 1.0)
    }
}

/// log2(3), entropy of a uniform three-way split
pub fn max_entropy_bits() -> f64 {
    3f64.log2()
}

pub struct DiversityAnalyzer;

impl DiversityAnalyzer {
    /// Computes diversity metrics. Batches with fewer than two signals have no diversity.
    pub fn analyze(signals: &[ModelSignal]) -> DiversityMetrics {
        if signals.len() < 2 {
            return DiversityMetrics::default();
        }

        let distribution = Self::action_distribution(signals);

        DiversityMetrics {
            average_pairwise_correlation: Self::average_pairwise_correlation(signals),
            entropy: shannon_entropy_bits(&distribution),
            gini_index: Self::gini_index(&distribution),
            variance: signals.iter().map(|s| s.confidence).population_variance(),
        }
    }

    /// Fraction of signals per action in BUY, SELL, HOLD order
    pub fn action_distribution(signals: &[ModelSignal]) -> [f64; 3] {
        let mut counts = [0.0; 3];
        for signal in signals {
            counts[signal.action.index()] += 1.0;
        }
        let total = signals.len().max(1) as f64;
        counts.map(|c| c / total)
    }

    fn average_pairwise_correlation(signals: &[ModelSignal]) -> f64 {
        let mut sum = 0.0;
        let mut pairs = 0usize;

        for i in 0..signals.len() {
            for j in (i + 1)..signals.len() {
                let a = &signals[i];
                let b = &signals[j];
                if a.action == b.action {
                    sum += 1.0 - (a.confidence - b.confidence).abs();
                }
                pairs += 1;
            }
        }

        if pairs == 0 { 0.0 } else { sum / pairs as f64 }
    }

    /// Discrete Gini coefficient of the action-probability vector.
    ///
    /// `G = sum_i (2i - n - 1) * x_i / (n * sum x)` over ascending `x`, 1-based `i`.
    fn gini_index(distribution: &[f64; 3]) -> f64 {
        let mut sorted = *distribution;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len() as f64;
        let total: f64 = sorted.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }

        let weighted: f64 = sorted
            .iter()
            .enumerate()
            .map(|(i, x)| (2.0 * (i as f64 + 1.0) - n - 1.0) * x)
            .sum();

        weighted / (n * total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::SignalAction;

    fn signal(id: &str, action: SignalAction, confidence: f64) -> ModelSignal {
        ModelSignal::new(id, action, confidence)
    }

    #[test]
    fn test_single_signal_has_zero_metrics() {
        let metrics = DiversityAnalyzer::analyze(&[signal("a", SignalAction::Buy, 0.9)]);
        assert_eq!(metrics, DiversityMetrics::default());
    }

    #[test]
    fn test_unanimous_batch_has_zero_entropy() {
        let signals = vec![
            signal("a", SignalAction::Sell, 0.7),
            signal("b", SignalAction::Sell, 0.7),
            signal("c", SignalAction::Sell, 0.7),
        ];
        let metrics = DiversityAnalyzer::analyze(&signals);

        assert_eq!(metrics.entropy, 0.0);
        assert!((metrics.average_pairwise_correlation - 1.0).abs() < 1e-12);
        assert!(metrics.variance.abs() < 1e-12);
        // Sorted [0, 0, 1] -> 2/3
        assert!((metrics.gini_index - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_three_way_split_has_max_entropy() {
        let signals = vec![
            signal("a", SignalAction::Buy, 0.6),
            signal("b", SignalAction::Sell, 0.6),
            signal("c", SignalAction::Hold, 0.6),
        ];
        let metrics = DiversityAnalyzer::analyze(&signals);

        assert!((metrics.entropy - 3f64.log2()).abs() < 1e-9);
        assert!((metrics.normalized_entropy() - 1.0).abs() < 1e-9);
        assert_eq!(metrics.average_pairwise_correlation, 0.0);
        assert!(metrics.gini_index.abs() < 1e-12);
    }

    #[test]
    fn test_pairwise_correlation_penalizes_confidence_gap() {
        let signals = vec![
            signal("a", SignalAction::Buy, 0.9),
            signal("b", SignalAction::Buy, 0.5),
        ];
        let metrics = DiversityAnalyzer::analyze(&signals);

        assert!((metrics.average_pairwise_correlation - 0.6).abs() < 1e-12);
        // Population variance of [0.9, 0.5]
        assert!((metrics.variance - 0.04).abs() < 1e-12);
    }
}
