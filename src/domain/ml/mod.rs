//! Model interfaces consumed by stacking and the explanation engine.

pub mod meta_features;
pub mod scorer;
pub mod softmax;

pub use meta_features::build_meta_features;
pub use scorer::{MetaLearner, Scorer};
pub use softmax::SoftmaxMetaLearner;
