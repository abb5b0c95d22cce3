//! Detection records and statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form detection metadata (camera, location, request id, ...)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Number of trailing records reported in [`DetectionStats::recent_detections`]
pub const RECENT_DETECTIONS: usize = 10;

/// One logged detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// ISO-8601 timestamp as supplied by the caller
    pub timestamp: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub alert_sent: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Aggregate view of the detection log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_detections: usize,
    pub alerts_sent: usize,
    /// Mean confidence, rounded to 3 decimals (0 for an empty log)
    pub average_confidence: f64,
    pub detections_by_class: BTreeMap<String, usize>,
    /// Last records in insertion order
    pub recent_detections: Vec<DetectionEvent>,
}

impl DetectionStats {
    /// Compute statistics over records in log order
    pub fn from_events(events: Vec<DetectionEvent>) -> Self {
        let total = events.len();
        let mut by_class = BTreeMap::new();
        let mut alerts_sent = 0;
        let mut confidence_sum = 0.0;

        for event in &events {
            *by_class.entry(event.class_name.clone()).or_insert(0) += 1;
            if event.alert_sent {
                alerts_sent += 1;
            }
            confidence_sum += event.confidence;
        }

        let average_confidence = if total > 0 {
            round3(confidence_sum / total as f64)
        } else {
            0.0
        };

        let mut recent = events;
        let recent_detections = recent.split_off(total.saturating_sub(RECENT_DETECTIONS));

        Self {
            total_detections: total,
            alerts_sent,
            average_confidence,
            detections_by_class: by_class,
            recent_detections,
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(class: &str, confidence: f64, alert_sent: bool) -> DetectionEvent {
        DetectionEvent {
            timestamp: "2024-01-15T10:00:00".to_string(),
            class_name: class.to_string(),
            confidence,
            alert_sent,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_stats_example() {
        let stats = DetectionStats::from_events(vec![
            event("pistol", 0.9, true),
            event("knife", 0.6, true),
            event("pistol", 0.3, false),
        ]);

        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.alerts_sent, 2);
        assert!((stats.average_confidence - 0.6).abs() < 1e-9);
        assert_eq!(stats.detections_by_class["pistol"], 2);
        assert_eq!(stats.detections_by_class["knife"], 1);
        assert_eq!(stats.recent_detections.len(), 3);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(DetectionStats::from_events(Vec::new()), DetectionStats::default());
    }

    #[test]
    fn test_recent_keeps_last_ten_in_order() {
        let events: Vec<_> = (0..25)
            .map(|i| event(&format!("class_{}", i), 0.5, false))
            .collect();

        let stats = DetectionStats::from_events(events);
        assert_eq!(stats.recent_detections.len(), RECENT_DETECTIONS);
        assert_eq!(stats.recent_detections[0].class_name, "class_15");
        assert_eq!(stats.recent_detections[9].class_name, "class_24");
    }

    #[test]
    fn test_record_wire_format() {
        let json = serde_json::to_string(&event("rifle", 0.75, true)).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":"2024-01-15T10:00:00","class":"rifle","confidence":0.75,"alert_sent":true,"metadata":{}}"#
        );

        let parsed: DetectionEvent =
            serde_json::from_str(r#"{"timestamp":"t","class":"knife","confidence":0.5}"#).unwrap();
        assert!(!parsed.alert_sent);
        assert!(parsed.metadata.is_empty());
    }
}
