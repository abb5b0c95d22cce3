//! Detected objects and box utilities

use serde::{Deserialize, Serialize};

use crate::{DetectorError, ObjectDetector, VideoFrame};

/// Bounding box in pixel coordinates (top-left, bottom-right)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a center-format box (YOLO output layout)
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Scale by per-axis factors and clamp to the frame
    pub fn scale(&self, sx: f32, sy: f32, width: u32, height: u32) -> Self {
        let max_x = width as f32;
        let max_y = height as f32;
        Self {
            x1: (self.x1 * sx).clamp(0.0, max_x),
            y1: (self.y1 * sy).clamp(0.0, max_y),
            x2: (self.x2 * sx).clamp(0.0, max_x),
            y2: (self.y2 * sy).clamp(0.0, max_y),
        }
    }

    /// Integer corners `[x1, y1, x2, y2]`
    pub fn to_pixels(&self) -> [i32; 4] {
        [
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        ]
    }
}

/// Detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label
    #[serde(rename = "class")]
    pub class_name: String,

    /// Detection confidence (0.0 to 1.0)
    pub confidence: f32,

    /// Bounding box in source frame coordinates
    pub bbox: BoundingBox,
}

impl DetectedObject {
    pub fn new(class_name: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }
}

/// Class-wise non-maximum suppression, highest confidence first
pub fn non_max_suppression(mut objects: Vec<DetectedObject>, iou_threshold: f32) -> Vec<DetectedObject> {
    objects.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<DetectedObject> = Vec::with_capacity(objects.len());
    for candidate in objects {
        let overlaps = kept.iter().any(|k| {
            k.class_name == candidate.class_name && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

/// Detector returning a fixed set of detections for every frame
pub struct ScriptedDetector {
    class_names: Vec<String>,
    detections: Vec<DetectedObject>,
}

impl ScriptedDetector {
    pub fn new(detections: Vec<DetectedObject>) -> Self {
        let mut class_names: Vec<String> = Vec::new();
        for d in &detections {
            if !class_names.contains(&d.class_name) {
                class_names.push(d.class_name.clone());
            }
        }
        Self {
            class_names,
            detections,
        }
    }

    /// Detector that never finds anything
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl ObjectDetector for ScriptedDetector {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectorError> {
        Ok(self
            .detections
            .iter()
            .map(|d| DetectedObject {
                bbox: d.bbox.scale(1.0, 1.0, frame.width, frame.height),
                ..d.clone()
            })
            .collect())
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}
