use crate::config::DetectorConfig;
use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend: Send {
    fn load_model(config: &DetectorConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a preprocessed `[1, 3, H, W]` input
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    /// Raw layout: `[1, 4 + num_classes, num_anchors]`.
    /// End-to-end layout: `[1, num_boxes, 6]`.
    pub predictions: ndarray::ArrayD<f32>,
}
