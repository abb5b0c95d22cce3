//! Alerting System
//!
//! Decides whether a weapon detection triggers notifications (one global
//! cooldown window) and fans the alert out to SMS, push and email channels.

mod channels;
mod config;
mod fcm;
mod manager;
mod twilio;

pub use channels::{
    AlertChannels, Channel, EmailSender, PushSender, SmsSender, UnavailableChannel,
    UnimplementedEmail,
};
pub use config::{AlertChannelConfig, AlertConfig, FirebaseConfig, TwilioConfig};
pub use fcm::FcmPush;
pub use manager::{format_alert_message, AlertManager};
pub use twilio::TwilioSms;

use thiserror::Error;

/// Notification channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0} provider not configured")]
    NotConfigured(Channel),

    #[error("{0} channel not implemented")]
    NotImplemented(Channel),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl ChannelError {
    /// Whether the channel was skipped rather than attempted
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ChannelError::NotConfigured(_) | ChannelError::NotImplemented(_)
        )
    }
}
