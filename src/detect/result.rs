use serde::{Deserialize, Serialize};

/// One bounding box reported by the detector for one frame.
///
/// Spatial fields are normalized to 0..1 relative to frame width/height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Detection {
    pub fn new(class_id: u32, x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            class_id,
            x_center,
            y_center,
            width,
            height,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Normalized box area (width × height).
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// The full, unfiltered detector output for a frame together with the
/// frame's pixel dimensions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameObservation {
    pub detections: Vec<Detection>,
    pub width: u32,
    pub height: u32,
}
