pub mod dataset;
pub mod evaluator;
pub mod labels;
pub mod metrics;

pub use dataset::{DatasetDescriptor, DatasetError};
pub use evaluator::{Evaluator, ValidationParams};
pub use labels::GroundTruthBox;
pub use metrics::{ValidationMetrics, f1_score};
