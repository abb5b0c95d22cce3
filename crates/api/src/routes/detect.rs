//! Detection Routes

use alerting::AlertChannelConfig;
use axum::{
    extract::{Multipart, State},
    Json,
};
use detector::DetectedObject;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::pipeline::{self, AlertSubject, EncodedFrame};
use crate::SharedState;

/// Response for a single uploaded image
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detected: bool,
    /// Highest confidence, 0 when nothing was found
    pub confidence: f64,
    /// Class of the highest-confidence detection, "none" when nothing was found
    pub class_name: String,
    pub timestamp: String,
    pub bounding_boxes: Vec<DetectedObject>,
    pub alert_sent: bool,
}

/// Base64 frame request, used by the frame endpoint and the stream
#[derive(Debug, Default, Deserialize)]
pub struct FrameRequest {
    pub frame: Option<String>,
    pub alert_config: Option<AlertChannelConfig>,
}

/// Compact detection entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetection {
    #[serde(rename = "class")]
    pub class_name: String,
    /// Rounded to 3 decimals
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [i32; 4],
}

impl From<&DetectedObject> for FrameDetection {
    fn from(object: &DetectedObject) -> Self {
        Self {
            class_name: object.class_name.clone(),
            confidence: (object.confidence as f64 * 1000.0).round() / 1000.0,
            bbox: object.bbox.to_pixels(),
        }
    }
}

/// Response for a base64 frame
#[derive(Debug, Serialize, Deserialize)]
pub struct FrameResponse {
    pub detected: bool,
    pub detections: Vec<FrameDetection>,
    pub frame_processed: bool,
    pub alert_sent: bool,
}

/// Detect weapons in an uploaded image.
///
/// Multipart fields: `file` (required), `alert_config` (optional JSON).
pub async fn detect_image(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<DetectionResponse>, ApiError> {
    if state.detector.is_none() {
        return Err(ApiError::ModelUnavailable);
    }

    let mut file = None;
    let mut alert_config: Option<AlertChannelConfig> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file = Some(bytes.to_vec());
            }
            "alert_config" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                let config = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid alert_config: {}", e)))?;
                alert_config = Some(config);
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("File not provided".to_string()))?;
    let objects = pipeline::run_detection(&state, EncodedFrame::Image(file)).await?;
    let timestamp = pipeline::now_timestamp();

    let Some(subject) = AlertSubject::top(&objects) else {
        return Ok(Json(DetectionResponse {
            detected: false,
            confidence: 0.0,
            class_name: "none".to_string(),
            timestamp,
            bounding_boxes: objects,
            alert_sent: false,
        }));
    };

    info!(
        "Image detection: {} ({:.2}), {} objects",
        subject.class_name,
        subject.confidence,
        objects.len()
    );
    let alert_sent = pipeline::record_detection(
        &state,
        &subject,
        objects.len(),
        &timestamp,
        alert_config.as_ref(),
        "image",
    )
    .await;

    Ok(Json(DetectionResponse {
        detected: true,
        confidence: subject.confidence,
        class_name: subject.class_name,
        timestamp,
        bounding_boxes: objects,
        alert_sent,
    }))
}

/// Detect weapons in a base64 frame, the mobile polling path
pub async fn detect_frame(
    State(state): State<SharedState>,
    Json(request): Json<FrameRequest>,
) -> Result<Json<FrameResponse>, ApiError> {
    if state.detector.is_none() {
        return Err(ApiError::ModelUnavailable);
    }

    let frame = request
        .frame
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Frame not provided".to_string()))?;

    let objects = pipeline::run_detection(&state, EncodedFrame::Base64(frame)).await?;
    let detections: Vec<FrameDetection> = objects.iter().map(FrameDetection::from).collect();

    let alert_sent = match AlertSubject::first(&objects) {
        Some(subject) => {
            let timestamp = pipeline::now_timestamp();
            pipeline::record_detection(
                &state,
                &subject,
                objects.len(),
                &timestamp,
                request.alert_config.as_ref(),
                "frame",
            )
            .await
        }
        None => false,
    };

    Ok(Json(FrameResponse {
        detected: !detections.is_empty(),
        detections,
        frame_processed: true,
        alert_sent,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use detector::BoundingBox;

    #[test]
    fn test_frame_detection_rounding() {
        let object = DetectedObject::new("pistol", 0.87654, BoundingBox::new(10.6, 20.2, 30.9, 40.0));
        let compact = FrameDetection::from(&object);
        assert_eq!(compact.confidence, 0.877);
        assert_eq!(compact.bbox, [10, 20, 30, 40]);

        let json = serde_json::to_value(&compact).unwrap();
        assert_eq!(json["class"], "pistol");
    }

    #[test]
    fn test_frame_request_defaults() {
        let request: FrameRequest = serde_json::from_str("{}").unwrap();
        assert!(request.frame.is_none());
        assert!(request.alert_config.is_none());

        let request: FrameRequest = serde_json::from_str(
            r#"{"frame":"abc","alert_config":{"fcm_token":"tok"}}"#,
        )
        .unwrap();
        assert_eq!(request.frame.as_deref(), Some("abc"));
        assert!(request.alert_config.unwrap().has_targets());
    }
}
