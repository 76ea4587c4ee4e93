use serde::Deserialize;

pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 10;
/// Largest accepted model input side.
pub const MAX_INPUT_SIZE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

/// Shape of the model's detection output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `[1, 4 + num_classes, num_anchors]`: cx, cy, w, h then per-class scores.
    /// Needs NMS.
    #[default]
    Raw,
    /// `[1, num_boxes, 6]`: x1, y1, x2, y2, score, class. NMS already applied.
    EndToEnd,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: String,
    /// Side of the square model input.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
    pub output_layout: OutputLayout,
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "weights/best.onnx".to_string(),
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            execution_provider: ExecutionProvider::Cpu,
            output_layout: OutputLayout::Raw,
            intra_threads: 4,
        }
    }
}

impl DetectorConfig {
    pub fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_iou(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    pub fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    /// Rejects values the pipeline cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input_size == 0 {
            anyhow::bail!("input_size must be positive");
        }
        if self.input_size > MAX_INPUT_SIZE {
            anyhow::bail!(
                "input_size must be at most {}, got {}",
                MAX_INPUT_SIZE,
                self.input_size
            );
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            anyhow::bail!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            );
        }
        Ok(())
    }
}
