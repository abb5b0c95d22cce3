//! Alert Configuration Routes

use alerting::AlertChannelConfig;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Acknowledgement for a submitted alert configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigAck {
    pub status: String,
    pub message: String,
    /// Enabled channels that lack a destination
    pub warnings: Vec<String>,
}

/// Validate an alert configuration. Nothing is stored; clients send their
/// configuration with every detection request.
pub async fn configure_alerts(Json(config): Json<AlertChannelConfig>) -> Json<ConfigAck> {
    let warnings = validate(&config);
    info!(
        "Alert configuration received: sms={} push={} email={}",
        config.sms_target().is_some(),
        config.push_target().is_some(),
        config.email_target().is_some()
    );

    Json(ConfigAck {
        status: "success".to_string(),
        message: "Alert configuration updated".to_string(),
        warnings,
    })
}

fn validate(config: &AlertChannelConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.enable_sms && config.sms_target().is_none() {
        warnings.push("SMS enabled without phone_number".to_string());
    }
    if config.enable_push && config.push_target().is_none() {
        warnings.push("Push enabled without fcm_token".to_string());
    }
    if config.enable_email && config.email_target().is_none() {
        warnings.push("Email enabled without email".to_string());
    }
    if config.enable_email && config.email_target().is_some() {
        warnings.push("Email alerts are not implemented".to_string());
    }
    warnings
}
