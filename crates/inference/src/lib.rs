pub mod backend;
pub mod config;
pub mod detection;
pub mod detector;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{DetectorConfig, ExecutionProvider, OutputLayout};
pub use detection::Detection;
pub use detector::{Detect, Detector};
