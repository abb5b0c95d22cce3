//! Weapon Detection
//!
//! Object detection over decoded camera frames:
//! - Image and base64 frame decoding
//! - YOLO-family ONNX inference via tract
//! - Confidence filtering and non-maximum suppression

pub mod config;
pub mod frame;
pub mod object;
pub mod onnx;

pub use config::DetectorConfig;
pub use frame::{decode_base64_frame, decode_image, VideoFrame};
pub use object::{BoundingBox, DetectedObject, ScriptedDetector};
pub use onnx::{decode_yolo_output, OnnxDetector};

use thiserror::Error;

/// Detector error types
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame decoding failed: {0}")]
    Decode(String),
}

/// Opaque object detector.
///
/// Implementations must be shareable across request handlers; inference is
/// expected to be CPU-bound and is run off the async executor by callers.
pub trait ObjectDetector: Send + Sync {
    /// Detect objects in a frame. Boxes are in the frame's pixel coordinates.
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectorError>;

    /// Class labels, indexed by model class id
    fn class_names(&self) -> &[String];
}

/// Highest-confidence detection, if any
pub fn top_detection(objects: &[DetectedObject]) -> Option<&DetectedObject> {
    objects
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_detection() {
        let objects = vec![
            DetectedObject::new("knife", 0.55, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            DetectedObject::new("pistol", 0.91, BoundingBox::new(5.0, 5.0, 20.0, 20.0)),
            DetectedObject::new("rifle", 0.42, BoundingBox::new(1.0, 1.0, 2.0, 2.0)),
        ];

        let top = top_detection(&objects).unwrap();
        assert_eq!(top.class_name, "pistol");
        assert!(top_detection(&[]).is_none());
    }
}
