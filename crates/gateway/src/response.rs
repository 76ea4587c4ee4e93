use serde::{Deserialize, Serialize};

/// Absolute pixel coordinates of a detected logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&inference::Detection> for Detection {
    /// Truncates toward zero; score and class are dropped.
    fn from(d: &inference::Detection) -> Self {
        Self {
            bbox: BoundingBox {
                x_min: d.x1 as u32,
                y_min: d.y1 as u32,
                x_max: d.x2 as u32,
                y_max: d.y2 as u32,
            },
        }
    }
}

impl From<&[inference::Detection]> for DetectionResponse {
    fn from(detections: &[inference::Detection]) -> Self {
        Self {
            detections: detections.iter().map(Detection::from).collect(),
        }
    }
}
