//! ONNX weapon detector (YOLO-family exports) backed by tract

use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::object::non_max_suppression;
use crate::{BoundingBox, DetectedObject, DetectorConfig, DetectorError, ObjectDetector, VideoFrame};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Detector running an ONNX model with a `[1, 3, S, S]` input and a
/// `[1, 4 + classes, anchors]` output
pub struct OnnxDetector {
    config: DetectorConfig,
    model: Model,
}

impl OnnxDetector {
    /// Load and optimize the model at `config.model_path`
    pub fn load(config: DetectorConfig) -> Result<Self, DetectorError> {
        info!("Loading detection model from {}", config.model_path);
        let size = config.input_size as usize;

        let model = tract_onnx::onnx()
            .model_for_path(&config.model_path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?;

        info!(
            "Detection model loaded ({} classes, input {}x{})",
            config.class_names.len(),
            size,
            size
        );
        Ok(Self { config, model })
    }

    fn preprocess(&self, frame: &VideoFrame) -> Tensor {
        let size = self.config.input_size;
        let resized = frame.resize(size, size);
        let size = size as usize;

        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            resized.data[(y * size + x) * 3 + c] as f32 / 255.0
        })
        .into()
    }
}

/// Decode a YOLO `[1, 4 + classes, anchors]` output into boxes in source
/// frame pixels, thresholded and suppressed per class
pub fn decode_yolo_output(
    config: &DetectorConfig,
    view: tract_ndarray::ArrayViewD<'_, f32>,
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<DetectedObject>, DetectorError> {
    let shape = view.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
        return Err(DetectorError::Inference(format!(
            "unexpected output shape {:?}",
            shape
        )));
    }

    let num_classes = shape[1] - 4;
    let anchors = shape[2];
    let sx = frame_width as f32 / config.input_size as f32;
    let sy = frame_height as f32 / config.input_size as f32;

    let mut candidates = Vec::new();
    for i in 0..anchors {
        let (class_id, score) = (0..num_classes)
            .map(|c| (c, view[[0, 4 + c, i]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < config.confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(
            view[[0, 0, i]],
            view[[0, 1, i]],
            view[[0, 2, i]],
            view[[0, 3, i]],
        )
        .scale(sx, sy, frame_width, frame_height);

        let class_name = config
            .class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id));

        candidates.push(DetectedObject::new(class_name, score, bbox));
    }

    Ok(non_max_suppression(candidates, config.iou_threshold))
}

impl ObjectDetector for OnnxDetector {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectorError> {
        let start = std::time::Instant::now();

        let input = self.preprocess(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| DetectorError::Inference("model produced no outputs".to_string()))?;

        let view = output
            .to_array_view::<f32>()
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let detections = decode_yolo_output(&self.config, view, frame.width, frame.height)?;
        debug!(
            "Inference found {} objects in {}ms",
            detections.len(),
            start.elapsed().as_millis()
        );
        Ok(detections)
    }

    fn class_names(&self) -> &[String] {
        &self.config.class_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_to_load() {
        let config = DetectorConfig {
            model_path: "/nonexistent/weapons.onnx".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            OnnxDetector::load(config),
            Err(DetectorError::ModelLoad(_))
        ));
    }

    /// `[1, 4 + 2, 4]` output: rows are cx, cy, w, h, then one score per class
    fn yolo_output() -> tract_ndarray::Array3<f32> {
        let anchors = [
            // cx, cy, w, h, pistol, knife
            [50.0, 50.0, 20.0, 20.0, 0.9, 0.1],
            [52.0, 50.0, 20.0, 20.0, 0.7, 0.2],
            [10.0, 10.0, 10.0, 10.0, 0.1, 0.3],
            [80.0, 20.0, 10.0, 10.0, 0.0, 0.6],
        ];
        let mut output = tract_ndarray::Array3::<f32>::zeros((1, 6, anchors.len()));
        for (i, anchor) in anchors.iter().enumerate() {
            for (row, value) in anchor.iter().enumerate() {
                output[[0, row, i]] = *value;
            }
        }
        output
    }

    fn small_config(class_names: Vec<String>) -> DetectorConfig {
        DetectorConfig {
            input_size: 100,
            class_names,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_yolo_output() {
        let config = small_config(vec!["pistol".to_string(), "knife".to_string()]);
        let output = yolo_output();

        // 200x100 source frame: x scaled by 2, y unchanged
        let objects = decode_yolo_output(&config, output.view().into_dyn(), 200, 100).unwrap();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].class_name, "pistol");
        assert!((objects[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(objects[0].bbox, BoundingBox::new(80.0, 40.0, 120.0, 60.0));

        assert_eq!(objects[1].class_name, "knife");
        assert!((objects[1].confidence - 0.6).abs() < 1e-6);
        assert_eq!(objects[1].bbox, BoundingBox::new(150.0, 15.0, 170.0, 25.0));
    }

    #[test]
    fn test_decode_unknown_class_ids() {
        let config = small_config(Vec::new());
        let output = yolo_output();

        let objects = decode_yolo_output(&config, output.view().into_dyn(), 100, 100).unwrap();
        let classes: Vec<_> = objects.iter().map(|o| o.class_name.as_str()).collect();
        assert_eq!(classes, vec!["class_0", "class_1"]);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let config = small_config(Vec::new());
        let output = tract_ndarray::Array3::<f32>::zeros((1, 4, 3));

        assert!(matches!(
            decode_yolo_output(&config, output.view().into_dyn(), 100, 100),
            Err(DetectorError::Inference(_))
        ));
    }
}
