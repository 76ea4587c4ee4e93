use crate::dataset::DatasetDescriptor;
use crate::labels;
use crate::metrics::{MatchCounts, ValidationMetrics, match_image};
use anyhow::Context;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use inference::{Detect, DetectorConfig};
use std::path::Path;

/// IoU at which a prediction counts as finding a labelled logo.
pub const MATCH_IOU_THRESHOLD: f32 = 0.5;

/// Hyperparameters of a validation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationParams {
    pub imgsz: u32,
    pub batch: usize,
    pub conf: f32,
    /// NMS IoU applied by the detector, not the matching IoU.
    pub iou: f32,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            imgsz: 640,
            batch: 16,
            conf: 0.4,
            iou: 0.5,
        }
    }
}

impl ValidationParams {
    pub fn detector_config(&self, model_path: &Path) -> DetectorConfig {
        DetectorConfig {
            model_path: model_path.to_string_lossy().into_owned(),
            ..DetectorConfig::default()
        }
        .with_input_size(self.imgsz)
        .with_confidence(self.conf)
        .with_iou(self.iou)
    }
}

pub struct Evaluator<'a> {
    detector: &'a dyn Detect,
    params: ValidationParams,
    show_progress: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(detector: &'a dyn Detect, params: ValidationParams) -> Self {
        Self {
            detector,
            params,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn evaluate(&self, dataset: &DatasetDescriptor) -> anyhow::Result<ValidationMetrics> {
        let images = dataset.list_images()?;
        tracing::info!(
            count = images.len(),
            dir = %dataset.image_dir().display(),
            batch = self.params.batch,
            "Evaluating images"
        );

        let progress = if self.show_progress {
            let bar = ProgressBar::new(images.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{msg} {bar:40} {pos}/{len} [{elapsed_precise}]")?,
            );
            bar.set_message("val");
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut counts = MatchCounts::default();

        for chunk in images.chunks(self.params.batch.max(1)) {
            let mut rasters = Vec::with_capacity(chunk.len());
            let mut truths = Vec::with_capacity(chunk.len());

            for path in chunk {
                let raster = load_rgb(path)?;
                let labels = labels::load_labels(
                    &dataset.label_path_for(path),
                    raster.width(),
                    raster.height(),
                )?;
                rasters.push(raster);
                truths.push(labels);
            }

            let predictions = self
                .detector
                .detect_batch(&rasters)
                .context("Detector failed on validation batch")?;

            if predictions.len() != rasters.len() {
                anyhow::bail!(
                    "Detector returned {} results for a batch of {} images",
                    predictions.len(),
                    rasters.len()
                );
            }

            for (preds, truth) in predictions.iter().zip(&truths) {
                counts += match_image(preds, truth, MATCH_IOU_THRESHOLD);
            }
            progress.inc(chunk.len() as u64);
        }

        progress.finish_and_clear();

        let metrics = ValidationMetrics::from_counts(counts);
        tracing::debug!(
            tp = counts.true_positives,
            fp = counts.false_positives,
            fn_ = counts.false_negatives,
            "Matching complete"
        );
        Ok(metrics)
    }
}

fn load_rgb(path: &Path) -> anyhow::Result<RgbImage> {
    let decoded = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?;
    Ok(decoded.to_rgb8())
}
