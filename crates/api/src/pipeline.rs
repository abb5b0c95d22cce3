//! Detection pipeline shared by the HTTP and WebSocket handlers
//!
//! Inference, then alert dispatch, then the log append.

use std::time::Instant;

use alerting::AlertChannelConfig;
use chrono::SecondsFormat;
use detector::{decode_base64_frame, decode_image, top_detection, DetectedObject};
use serde_json::json;
use storage::Metadata;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::AppState;

/// The detection an alert and log record are raised for
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSubject {
    pub class_name: String,
    pub confidence: f64,
}

impl AlertSubject {
    /// Highest-confidence detection
    pub fn top(objects: &[DetectedObject]) -> Option<Self> {
        top_detection(objects).map(|top| Self {
            class_name: top.class_name.clone(),
            confidence: widen(top.confidence),
        })
    }

    /// First detection's class with the maximum confidence of the frame
    pub fn first(objects: &[DetectedObject]) -> Option<Self> {
        let first = objects.first()?;
        let confidence = objects
            .iter()
            .map(|o| o.confidence)
            .fold(f32::MIN, f32::max);
        Some(Self {
            class_name: first.class_name.clone(),
            confidence: widen(confidence),
        })
    }
}

/// Encoded frame as received from a client
#[derive(Debug)]
pub enum EncodedFrame {
    /// Raw image file bytes (JPEG, PNG, ...)
    Image(Vec<u8>),
    /// Base64 image, optionally a `data:` URL
    Base64(String),
}

/// Decode the frame and run the detector on a blocking worker thread
pub async fn run_detection(
    state: &AppState,
    encoded: EncodedFrame,
) -> Result<Vec<DetectedObject>, ApiError> {
    let detector = state.detector.clone().ok_or(ApiError::ModelUnavailable)?;

    let objects = tokio::task::spawn_blocking(move || {
        let frame = match encoded {
            EncodedFrame::Image(bytes) => decode_image(&bytes)?,
            EncodedFrame::Base64(text) => decode_base64_frame(&text)?,
        };
        let start = Instant::now();
        let result = detector.detect(&frame);
        metrics::histogram!("armsight_inference_seconds").record(start.elapsed().as_secs_f64());
        result
    })
    .await
    .map_err(|e| ApiError::Internal(format!("inference task failed: {}", e)))??;

    for object in &objects {
        metrics::counter!("armsight_detections_total", "class" => object.class_name.clone())
            .increment(1);
    }
    debug!("{} objects detected", objects.len());
    Ok(objects)
}

/// Alert (when targets are configured) and append the detection record.
///
/// Returns whether the alert reached at least one channel.
pub async fn record_detection(
    state: &AppState,
    subject: &AlertSubject,
    object_count: usize,
    timestamp: &str,
    alert_config: Option<&AlertChannelConfig>,
    source: &str,
) -> bool {
    let alert_sent = match alert_config.filter(|config| config.has_targets()) {
        Some(config) => {
            state
                .alert_manager
                .send_alert(&subject.class_name, subject.confidence, timestamp, config)
                .await
        }
        None => false,
    };

    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!(source));
    metadata.insert(
        "request_id".to_string(),
        json!(uuid::Uuid::new_v4().to_string()),
    );
    metadata.insert("objects".to_string(), json!(object_count));

    if let Err(e) = state.detection_logger.log_detection(
        &subject.class_name,
        subject.confidence,
        timestamp,
        alert_sent,
        Some(metadata),
    ) {
        error!("Failed to log detection: {}", e);
    }

    alert_sent
}

/// Local time, ISO-8601 with milliseconds
pub fn now_timestamp() -> String {
    chrono::Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Model confidences are f32; records carry them as f64 rounded to 6 places
pub fn widen(confidence: f32) -> f64 {
    (confidence as f64 * 1e6).round() / 1e6
}
