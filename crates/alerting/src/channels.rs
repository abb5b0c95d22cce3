//! Notification channel capabilities

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::{ChannelError, FcmPush, FirebaseConfig, TwilioConfig, TwilioSms};

/// Notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Sms,
    Push,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Push => "push",
            Channel::Email => "email",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends text messages
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), ChannelError>;
}

/// Sends mobile push notifications
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_push(&self, token: &str, title: &str, body: &str) -> Result<(), ChannelError>;
}

/// Sends email
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ChannelError>;
}

/// Stand-in for a provider whose credentials are missing
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableChannel;

#[async_trait]
impl SmsSender for UnavailableChannel {
    async fn send_sms(&self, _to: &str, _body: &str) -> Result<(), ChannelError> {
        Err(ChannelError::NotConfigured(Channel::Sms))
    }
}

#[async_trait]
impl PushSender for UnavailableChannel {
    async fn send_push(&self, _token: &str, _title: &str, _body: &str) -> Result<(), ChannelError> {
        Err(ChannelError::NotConfigured(Channel::Push))
    }
}

#[async_trait]
impl EmailSender for UnavailableChannel {
    async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), ChannelError> {
        Err(ChannelError::NotConfigured(Channel::Email))
    }
}

/// Email has no transport yet; every send reports not-sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedEmail;

#[async_trait]
impl EmailSender for UnimplementedEmail {
    async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), ChannelError> {
        Err(ChannelError::NotImplemented(Channel::Email))
    }
}

/// The set of channel implementations an alert manager dispatches to
#[derive(Clone)]
pub struct AlertChannels {
    pub sms: Arc<dyn SmsSender>,
    pub push: Arc<dyn PushSender>,
    pub email: Arc<dyn EmailSender>,
}

impl AlertChannels {
    /// Every channel unavailable
    pub fn unavailable() -> Self {
        Self {
            sms: Arc::new(UnavailableChannel),
            push: Arc::new(UnavailableChannel),
            email: Arc::new(UnavailableChannel),
        }
    }

    /// Select provider implementations from the configured credentials
    pub fn from_config(
        twilio: &TwilioConfig,
        firebase: &FirebaseConfig,
        request_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        let sms: Arc<dyn SmsSender> = match TwilioSms::from_config(twilio, client.clone()) {
            Some(sms) => {
                info!("Twilio SMS configured");
                Arc::new(sms)
            }
            None => {
                warn!("Twilio credentials not configured, SMS alerts disabled");
                Arc::new(UnavailableChannel)
            }
        };

        let push: Arc<dyn PushSender> = match FcmPush::from_config(firebase, client) {
            Some(push) => {
                info!("Firebase push configured");
                Arc::new(push)
            }
            None => {
                warn!("Firebase credentials not configured, push alerts disabled");
                Arc::new(UnavailableChannel)
            }
        };

        Ok(Self {
            sms,
            push,
            email: Arc::new(UnimplementedEmail),
        })
    }
}

impl Default for AlertChannels {
    fn default() -> Self {
        Self::unavailable()
    }
}
