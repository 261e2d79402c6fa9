// Aggregation strategies and their registry
pub mod aggregation;

// Outcome-driven weight adaptation
pub mod adaptation;

// Shapley, local surrogate, decision path, risk factors, narrative
pub mod explanation;

// Synchronous engine and its async facade
pub mod engine;
pub mod service;

pub use engine::EnsembleEngine;
pub use service::EnsembleService;
