use crate::config::ExplanationConfig;
use crate::domain::explanation::DecisionStep;
use crate::domain::signal::SignalAction;
use statrs::statistics::Statistics;

/// Greedy single-branch path over the most informative features.
///
/// Each step takes the unused feature with the largest `|value| / (variance + 1)`, where
/// variance is taken over the whole vector, and splits at half its value. The path stops
/// at the first step that decides BUY or SELL.
pub fn build_decision_path(features: &[f64], config: &ExplanationConfig) -> Vec<DecisionStep> {
    if features.is_empty() {
        return Vec::new();
    }

    let variance = features.iter().copied().population_variance();
    let variance = if variance.is_finite() { variance } else { 0.0 };
    let gain = |value: f64| value.abs() / (variance + 1.0);

    let mut used = vec![false; features.len()];
    let mut path = Vec::new();

    for depth in 0..config.max_path_depth.min(features.len()) {
        let Some(index) = (0..features.len())
            .filter(|&i| !used[i])
            .fold(None, |best: Option<usize>, i| match best {
                Some(b) if gain(features[b]) >= gain(features[i]) => Some(b),
                _ => Some(i),
            })
        else {
            break;
        };
        used[index] = true;

        let value = features[index];
        let threshold = value * 0.5;
        let decision = split_decision(value, threshold, config.min_split_magnitude);

        path.push(DecisionStep {
            depth,
            feature_index: index,
            feature_name: config.feature_name(index),
            value,
            threshold,
            information_gain: gain(value),
            decision,
        });

        if decision != SignalAction::Hold {
            break;
        }
    }

    path
}

fn split_decision(value: f64, threshold: f64, min_magnitude: f64) -> SignalAction {
    if value.abs() < min_magnitude {
        SignalAction::Hold
    } else if value > threshold && value > 0.0 {
        SignalAction::Buy
    } else if value < threshold && value < 0.0 {
        SignalAction::Sell
    } else {
        SignalAction::Hold
    }
}
