use super::TransformParams;
use crate::config::OutputLayout;
use crate::detection::Detection;
use common::span_debug;
use std::cmp::Ordering;

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub layout: OutputLayout,
}

impl PostProcessor {
    pub fn new(
        confidence_threshold: f32,
        iou_threshold: f32,
        max_detections: usize,
        layout: OutputLayout,
    ) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
            layout,
        }
    }

    /// Turn the model output into at most `max_detections` boxes in original
    /// image coordinates, sorted by descending confidence.
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let _s = span_debug!("parse_detections");

        if predictions.ndim() != 3 || predictions.shape()[0] != 1 {
            anyhow::bail!(
                "Unexpected model output shape {:?}, expected [1, _, _]",
                predictions.shape()
            );
        }

        let mut detections = match self.layout {
            OutputLayout::Raw => {
                let candidates = self.decode_raw(predictions, transform)?;
                non_maximum_suppression(candidates, self.iou_threshold)
            }
            OutputLayout::EndToEnd => {
                let mut candidates = self.decode_end_to_end(predictions, transform)?;
                sort_by_confidence(&mut candidates);
                candidates
            }
        };

        detections.truncate(self.max_detections);

        tracing::trace!(count = detections.len(), "Parsed detections");

        Ok(detections)
    }

    /// `[1, 4 + nc, N]`: columns are anchors, rows are cx, cy, w, h, class scores.
    fn decode_raw(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let channels = predictions.shape()[1];
        let num_anchors = predictions.shape()[2];

        if channels < 5 {
            anyhow::bail!(
                "Model output has {} channels, expected 4 box coordinates plus class scores",
                channels
            );
        }

        let mut detections = Vec::new();

        for i in 0..num_anchors {
            // argmax over class scores
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 4..channels {
                let score = predictions[[0, c, i]];
                if score > confidence {
                    confidence = score;
                    class_id = c - 4;
                }
            }

            if confidence < self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(
                predictions[[0, 0, i]],
                predictions[[0, 1, i]],
                predictions[[0, 2, i]],
                predictions[[0, 3, i]],
            );

            detections.push(to_original(
                (x1, y1, x2, y2),
                confidence,
                class_id as u32,
                transform,
            ));
        }

        Ok(detections)
    }

    /// `[1, N, 6]`: rows are x1, y1, x2, y2, score, class in model-input pixels.
    fn decode_end_to_end(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let num_boxes = predictions.shape()[1];
        let fields = predictions.shape()[2];

        if fields < 6 {
            anyhow::bail!("End-to-end output has {} fields per box, expected 6", fields);
        }

        let mut detections = Vec::new();

        for i in 0..num_boxes {
            let confidence = predictions[[0, i, 4]];
            if confidence < self.confidence_threshold {
                continue;
            }

            detections.push(to_original(
                (
                    predictions[[0, i, 0]],
                    predictions[[0, i, 1]],
                    predictions[[0, i, 2]],
                    predictions[[0, i, 3]],
                ),
                confidence,
                predictions[[0, i, 5]].max(0.0) as u32,
                transform,
            ));
        }

        Ok(detections)
    }
}

/// Apply the inverse letterbox transform, clamp to the image and order corners.
fn to_original(
    (x1, y1, x2, y2): (f32, f32, f32, f32),
    confidence: f32,
    class_id: u32,
    transform: &TransformParams,
) -> Detection {
    let max_x = transform.orig_width as f32;
    let max_y = transform.orig_height as f32;

    let x1 = ((x1 - transform.offset_x) / transform.scale).clamp(0.0, max_x);
    let y1 = ((y1 - transform.offset_y) / transform.scale).clamp(0.0, max_y);
    let x2 = ((x2 - transform.offset_x) / transform.scale).clamp(0.0, max_x);
    let y2 = ((y2 - transform.offset_y) / transform.scale).clamp(0.0, max_y);

    Detection {
        x1: x1.min(x2),
        y1: y1.min(y2),
        x2: x1.max(x2),
        y2: y1.max(y2),
        confidence,
        class_id,
    }
}

fn sort_by_confidence(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
}

/// Class-aware greedy NMS. Returns the kept boxes by descending confidence.
pub fn non_maximum_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
) -> Vec<Detection> {
    sort_by_confidence(&mut detections);

    let mut suppressed = vec![false; detections.len()];
    for current in 0..detections.len() {
        if suppressed[current] {
            continue;
        }
        for other in current + 1..detections.len() {
            if suppressed[other] || detections[current].class_id != detections[other].class_id {
                continue;
            }
            if detections[current].iou(&detections[other]) > iou_threshold {
                suppressed[other] = true;
            }
        }
    }

    let mut keep = suppressed.iter();
    detections.retain(|_| !keep.next().copied().unwrap_or(true));
    detections
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
