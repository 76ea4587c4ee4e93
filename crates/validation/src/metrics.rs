use crate::labels::GroundTruthBox;
use inference::{Detection, detection::iou_xyxy};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// Added to the F1 denominator so P = R = 0 yields 0 instead of NaN.
pub const F1_EPSILON: f64 = 1e-10;

pub const PRECISION_KEY: &str = "metrics/precision(B)";
pub const RECALL_KEY: &str = "metrics/recall(B)";
pub const F1_KEY: &str = "metrics/f1(B)";

pub fn f1_score(precision: f64, recall: f64) -> f64 {
    2.0 * precision * recall / (precision + recall + F1_EPSILON)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl AddAssign for MatchCounts {
    fn add_assign(&mut self, other: Self) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }
}

/// Greedy matching for one image: predictions in descending confidence each
/// claim the unmatched same-class ground truth box with the highest IoU, if
/// that IoU reaches `iou_threshold`.
pub fn match_image(
    predictions: &[Detection],
    ground_truth: &[GroundTruthBox],
    iou_threshold: f32,
) -> MatchCounts {
    let mut order: Vec<usize> = (0..predictions.len()).collect();
    order.sort_by(|&a, &b| {
        predictions[b]
            .confidence
            .partial_cmp(&predictions[a].confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut matched = vec![false; ground_truth.len()];
    let mut counts = MatchCounts::default();

    for i in order {
        let pred = &predictions[i];
        let pred_corners = (pred.x1, pred.y1, pred.x2, pred.y2);

        let best = ground_truth
            .iter()
            .enumerate()
            .filter(|(j, gt)| !matched[*j] && gt.class_id == pred.class_id)
            .map(|(j, gt)| (j, iou_xyxy(pred_corners, gt.corners())))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        match best {
            Some((j, iou)) if iou >= iou_threshold => {
                matched[j] = true;
                counts.true_positives += 1;
            }
            _ => counts.false_positives += 1,
        }
    }

    counts.false_negatives = matched.iter().filter(|m| !**m).count();
    counts
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationMetrics {
    pub counts: MatchCounts,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ValidationMetrics {
    pub fn from_counts(counts: MatchCounts) -> Self {
        let precision = ratio(
            counts.true_positives,
            counts.true_positives + counts.false_positives,
        );
        let recall = ratio(
            counts.true_positives,
            counts.true_positives + counts.false_negatives,
        );

        Self {
            counts,
            precision,
            recall,
            f1: f1_score(precision, recall),
        }
    }

    pub fn results_dict(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            (PRECISION_KEY, self.precision),
            (RECALL_KEY, self.recall),
            (F1_KEY, self.f1),
        ])
    }

    /// The three summary lines printed by the `validate` binary.
    ///
    /// Precision and recall are read back from [`Self::results_dict`] and F1
    /// is recomputed from them.
    pub fn report_lines(&self) -> [String; 3] {
        let results = self.results_dict();
        let precision = results.get(PRECISION_KEY).copied().unwrap_or_default();
        let recall = results.get(RECALL_KEY).copied().unwrap_or_default();

        [
            format!("Precision: {:.3}", precision),
            format!("Recall: {:.3}", recall),
            format!("F1-score: {:.3}", f1_score(precision, recall)),
        ]
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
