use crate::domain::signal::ModelSignal;

/// Values per signal in the stacking input vector: confidence, strength, probability and
/// signed action. Any change here is a breaking change for trained meta-learners.
pub const SLOT_WIDTH: usize = 4;

/// Concatenates each signal's slot and zero-pads or truncates to `input_width`
pub fn build_meta_features(signals: &[ModelSignal], input_width: usize) -> Vec<f64> {
    let mut features = Vec::with_capacity(input_width);

    for signal in signals {
        features.extend_from_slice(&[
            signal.confidence,
            signal.strength,
            signal.probability,
            signal.action.signed(),
        ]);
        if features.len() >= input_width {
            break;
        }
    }

    features.resize(input_width, 0.0);
    features
}
