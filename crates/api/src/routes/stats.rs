//! Detection Statistics Routes

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use storage::{DetectionEvent, DetectionStats};

use crate::SharedState;

/// Response for the per-date endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct DateDetectionsResponse {
    pub date: String,
    pub count: usize,
    pub detections: Vec<DetectionEvent>,
}

/// Aggregate statistics over the detection log
pub async fn get_stats(State(state): State<SharedState>) -> Json<DetectionStats> {
    Json(state.detection_logger.get_stats())
}

/// Detections whose timestamp starts with `date` (e.g. "2024-01-15")
pub async fn get_detections_by_date(
    State(state): State<SharedState>,
    Path(date): Path<String>,
) -> Json<DateDetectionsResponse> {
    let detections = state.detection_logger.get_detections_by_date(&date);
    Json(DateDetectionsResponse {
        count: detections.len(),
        date,
        detections,
    })
}
