//! Detector configuration

use serde::{Deserialize, Serialize};

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Path to the ONNX model export
    pub model_path: String,

    /// Square model input size (pixels)
    pub input_size: u32,

    /// Minimum class score to keep a box
    pub confidence_threshold: f32,

    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,

    /// Class labels in model output order
    pub class_names: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/weapons.onnx".to_string(),
            input_size: 640,
            confidence_threshold: 0.4,
            iou_threshold: 0.45,
            class_names: vec![
                "pistol".to_string(),
                "knife".to_string(),
                "rifle".to_string(),
            ],
        }
    }
}
