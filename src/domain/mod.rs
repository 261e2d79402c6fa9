// Signal model (upstream strategies -> ensemble)
pub mod signal;

// Diversity, risk, weights and decision history
pub mod ensemble;

// Scorer and meta-learner interfaces
pub mod ml;

// Explanation result types
pub mod explanation;

// Domain-specific error types
pub mod errors;
