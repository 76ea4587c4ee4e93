use crate::{
    backend::{InferenceBackend, InferenceOutput},
    config::DetectorConfig,
    detection::Detection,
    processing::{post::PostProcessor, pre::PreProcessor},
};
use image::RgbImage;
use std::sync::Mutex;
use std::time::Instant;

/// The detection capability: given an image, return scored boxes in image
/// pixel coordinates. Implementations are shared across request handlers.
pub trait Detect: Send + Sync {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<Detection>>;

    fn detect_batch(&self, images: &[RgbImage]) -> anyhow::Result<Vec<Vec<Detection>>> {
        images.iter().map(|image| self.detect(image)).collect()
    }
}

/// Pre-processing, model and post-processing composed behind [`Detect`].
///
/// The backend session needs exclusive access while running, so calls are
/// serialized on an internal lock.
pub struct Detector<B: InferenceBackend> {
    backend: Mutex<B>,
    config: DetectorConfig,
    postprocessor: PostProcessor,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, config: DetectorConfig) -> Self {
        let postprocessor = PostProcessor::new(
            config.confidence_threshold,
            config.iou_threshold,
            config.max_detections,
            config.output_layout,
        );
        Self {
            backend: Mutex::new(backend),
            config,
            postprocessor,
        }
    }

    /// Validate the configuration and load the backend from `config.model_path`.
    pub fn load(config: DetectorConfig) -> anyhow::Result<Self> {
        config.validate()?;

        tracing::info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Loading detection model"
        );
        let backend = B::load_model(&config)?;
        tracing::info!("Model loaded successfully");

        Ok(Self::new(backend, config))
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

impl<B: InferenceBackend> Detect for Detector<B> {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        let start = Instant::now();

        let mut preprocessor = PreProcessor::square(self.config.input_size);
        let (input, transform) = preprocessor.preprocess_image(image)?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            let mut backend = self.backend.lock().unwrap_or_else(|poisoned| {
                tracing::error!("Previous inference panicked, reusing backend");
                self.backend.clear_poison();
                poisoned.into_inner()
            });
            backend.infer(&input)?
        };

        let detections = self
            .postprocessor
            .parse_detections(&predictions.view(), &transform)?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            detections = detections.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image processed"
        );

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::{Array, IxDyn};

    /// Backend returning a fixed raw output regardless of input
    struct FixedBackend {
        predictions: ndarray::ArrayD<f32>,
        calls: usize,
    }

    impl InferenceBackend for FixedBackend {
        fn load_model(_config: &DetectorConfig) -> anyhow::Result<Self> {
            Ok(Self {
                predictions: Array::zeros(IxDyn(&[1, 5, 0])),
                calls: 0,
            })
        }

        fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
            assert_eq!(images.shape(), &[1, 3, 640, 640]);
            self.calls += 1;
            Ok(InferenceOutput {
                predictions: self.predictions.clone(),
            })
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn load_model(_config: &DetectorConfig) -> anyhow::Result<Self> {
            anyhow::bail!("weights not found")
        }

        fn infer(&mut self, _images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
            anyhow::bail!("session failed")
        }
    }

    fn one_box_output() -> ndarray::ArrayD<f32> {
        let mut out = Array::zeros(IxDyn(&[1, 5, 2]));
        // Box centred in the padded input, 160x80
        out[[0, 0, 0]] = 320.0;
        out[[0, 1, 0]] = 320.0;
        out[[0, 2, 0]] = 160.0;
        out[[0, 3, 0]] = 80.0;
        out[[0, 4, 0]] = 0.9;
        // Below threshold
        out[[0, 4, 1]] = 0.1;
        out
    }

    #[test]
    fn test_detect_maps_to_original_coordinates() {
        let backend = FixedBackend {
            predictions: one_box_output(),
            calls: 0,
        };
        let detector = Detector::new(backend, DetectorConfig::default());
        let image = RgbImage::from_pixel(800, 600, Rgb([0, 0, 0]));

        let dets = detector.detect(&image).unwrap();

        assert_eq!(dets.len(), 1);
        assert!((dets[0].x1 - 300.0).abs() < 1e-3);
        assert!((dets[0].y1 - 250.0).abs() < 1e-3);
        assert!((dets[0].x2 - 500.0).abs() < 1e-3);
        assert!((dets[0].y2 - 350.0).abs() < 1e-3);
    }

    #[test]
    fn test_detect_batch_runs_each_image() {
        let backend = FixedBackend {
            predictions: one_box_output(),
            calls: 0,
        };
        let detector = Detector::new(backend, DetectorConfig::default());
        let images = vec![RgbImage::from_pixel(64, 64, Rgb([1, 2, 3])); 3];

        let results = detector.detect_batch(&images).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(detector.backend.lock().unwrap().calls, 3);
    }

    #[test]
    fn test_backend_error_propagates() {
        let detector = Detector::new(FailingBackend, DetectorConfig::default());
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));

        let err = detector.detect(&image).unwrap_err();
        assert!(err.to_string().contains("session failed"));
    }

    /// Panics on its first run, then behaves like an empty model.
    struct PanicOnceBackend {
        panicked: bool,
    }

    impl InferenceBackend for PanicOnceBackend {
        fn load_model(_config: &DetectorConfig) -> anyhow::Result<Self> {
            Ok(Self { panicked: false })
        }

        fn infer(&mut self, _images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
            if !self.panicked {
                self.panicked = true;
                panic!("kernel crashed");
            }
            Ok(InferenceOutput {
                predictions: Array::zeros(IxDyn(&[1, 5, 1])),
            })
        }
    }

    #[test]
    fn test_detector_recovers_after_backend_panic() {
        let detector = Detector::new(
            PanicOnceBackend { panicked: false },
            DetectorConfig::default(),
        );
        let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            detector.detect(&image)
        }));
        assert!(first.is_err());
        assert!(detector.backend.is_poisoned());

        assert!(detector.detect(&image).unwrap().is_empty());
        assert!(!detector.backend.is_poisoned());
        assert!(detector.detect(&image).unwrap().is_empty());
    }

    #[test]
    fn test_load_validates_config_first() {
        let config = DetectorConfig::default().with_confidence(2.0);
        assert!(Detector::<FixedBackend>::load(config).is_err());

        let err = Detector::<FailingBackend>::load(DetectorConfig::default()).err().unwrap();
        assert!(err.to_string().contains("weights not found"));
    }
}
