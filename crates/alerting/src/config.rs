//! Alert configuration

use serde::{Deserialize, Serialize};

/// Alert manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minimum time between two dispatched alerts (seconds)
    pub cooldown_secs: u64,
    /// Upper bound for a single channel send (seconds)
    pub channel_timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            channel_timeout_secs: 10,
        }
    }
}

/// Per-request notification targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertChannelConfig {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub fcm_token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub enable_sms: bool,
    #[serde(default = "default_true")]
    pub enable_push: bool,
    #[serde(default)]
    pub enable_email: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AlertChannelConfig {
    fn default() -> Self {
        Self {
            phone_number: None,
            fcm_token: None,
            email: None,
            enable_sms: false,
            enable_push: true,
            enable_email: false,
        }
    }
}

impl AlertChannelConfig {
    /// SMS destination, if the channel is enabled and a number is present
    pub fn sms_target(&self) -> Option<&str> {
        non_empty(self.enable_sms, self.phone_number.as_deref())
    }

    /// Push device token, if the channel is enabled and a token is present
    pub fn push_target(&self) -> Option<&str> {
        non_empty(self.enable_push, self.fcm_token.as_deref())
    }

    /// Email address, if the channel is enabled and an address is present
    pub fn email_target(&self) -> Option<&str> {
        non_empty(self.enable_email, self.email.as_deref())
    }

    /// Whether any channel would be attempted
    pub fn has_targets(&self) -> bool {
        self.sms_target().is_some() || self.push_target().is_some() || self.email_target().is_some()
    }
}

fn non_empty(enabled: bool, value: Option<&str>) -> Option<&str> {
    match value {
        Some(v) if enabled && !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Twilio SMS credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Sender number
    pub phone_number: Option<String>,
    pub base_url: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            phone_number: None,
            base_url: "https://api.twilio.com".to_string(),
        }
    }
}

/// Firebase Cloud Messaging (HTTP v1) credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    /// OAuth2 bearer token for the messaging scope
    pub access_token: Option<String>,
    pub base_url: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            access_token: None,
            base_url: "https://fcm.googleapis.com".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let config: AlertChannelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AlertChannelConfig::default());
        assert!(config.enable_push);
        assert!(!config.enable_sms);
        assert!(!config.has_targets());
    }

    #[test]
    fn test_targets_require_flag_and_value() {
        let config = AlertChannelConfig {
            phone_number: Some("+15550001111".to_string()),
            fcm_token: Some("   ".to_string()),
            email: Some("ops@example.com".to_string()),
            enable_sms: true,
            enable_push: true,
            enable_email: false,
        };

        assert_eq!(config.sms_target(), Some("+15550001111"));
        assert_eq!(config.push_target(), None);
        assert_eq!(config.email_target(), None);
        assert!(config.has_targets());
    }
}
