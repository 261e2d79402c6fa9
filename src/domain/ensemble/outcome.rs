use crate::domain::signal::SignalAction;

/// Maps a realized return onto the action that would have been right.
///
/// Returns above `+threshold` call for BUY, below `-threshold` for SELL,
/// anything inside the band for HOLD.
pub fn outcome_category(outcome: f64, threshold: f64) -> SignalAction {
    if outcome > threshold {
        SignalAction::Buy
    } else if outcome < -threshold {
        SignalAction::Sell
    } else {
        SignalAction::Hold
    }
}
